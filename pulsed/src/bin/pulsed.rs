//! Pulse counter daemon.
//!
//! Wires the capabilities (sysfs input line, file storage, HTTP collector)
//! to the core tasks and runs until interrupted.

use std::env;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use pulsed::config::CounterConfig;
use pulsed::count::SharedCount;
use pulsed::debounce::{EdgeCounter, edge_channel};
use pulsed::hw::sysfs::{SysfsLine, watch_edges};
use pulsed::reporter::Reporter;
use pulsed::store::CounterStore;
use pulsed::store::file::FileStorage;
use pulsed::tracing::prelude::*;
use pulsed::transport::http::HttpTransport;

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    pulsed::tracing::init();

    let config = CounterConfig::default();
    let gpio_path = env_or("PULSED_GPIO_VALUE", "/sys/class/gpio/gpio17/value");
    let storage_path = env_or("PULSED_STORAGE_PATH", "/var/lib/pulsed/count.bin");
    let collector_url = env_or("PULSED_COLLECTOR_URL", "http://127.0.0.1:8080");

    // The count must be restored before any edge is processed.
    let storage = FileStorage::open(&storage_path)
        .await
        .with_context(|| format!("failed to open storage file {storage_path}"))?;
    let (store, initial) = CounterStore::load_or_init(storage, config.storage_offset).await;
    let count = SharedCount::new(initial);

    let cancellation = CancellationToken::new();
    let (edge_tx, edge_rx) = edge_channel();

    tokio::spawn(watch_edges(
        SysfsLine::new(&gpio_path),
        edge_tx,
        cancellation.clone(),
    ));

    let counter = EdgeCounter::new(SysfsLine::new(&gpio_path), edge_rx, count.clone(), &config);
    tokio::spawn(counter.run(cancellation.clone()));

    let transport = HttpTransport::new(collector_url);
    let reporter = Reporter::new(config, store, transport, count.clone());
    let reporter_task = tokio::spawn(reporter.run(cancellation.clone()));

    info!(count = initial, line = %gpio_path, "Pulse counter running");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown requested");
    cancellation.cancel();

    // Wait for the reporter's final persist before exiting.
    reporter_task.await.context("reporter task panicked")?;

    Ok(())
}
