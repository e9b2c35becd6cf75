//! Input line backed by a sysfs GPIO value file.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{InputLine, Level};
use crate::debounce::Edge;
use crate::tracing::prelude::*;

/// How often the watcher samples the line for transitions. Far shorter than
/// the settle window, so a real closure cannot slip between samples.
const SAMPLE_PERIOD: Duration = Duration::from_millis(1);

/// An input line read from a sysfs GPIO `value` file.
pub struct SysfsLine {
    path: PathBuf,
}

impl SysfsLine {
    /// Create a line for the given `value` file, e.g.
    /// `/sys/class/gpio/gpio17/value`. The pin is assumed to be exported and
    /// configured as a pulled-up input by the platform.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl InputLine for SysfsLine {
    async fn read(&mut self) -> std::io::Result<Level> {
        let raw = tokio::fs::read(&self.path).await?;
        Ok(match raw.first() {
            Some(b'0') => Level::Low,
            _ => Level::High,
        })
    }
}

/// Watch the line and emit an [`Edge`] for every falling transition.
///
/// This is the interrupt stand-in on a Linux host: a tight sampling loop
/// instead of `attachInterrupt`. Edges are forwarded with `try_send` so the
/// watcher never blocks on the counter; a full queue is harmless because a
/// burst of edges collapses into one settle check anyway.
//
// TODO: move to /dev/gpiochip edge events (gpio-cdev) and drop the
// polling loop.
pub async fn watch_edges(
    mut line: SysfsLine,
    edge_tx: mpsc::Sender<Edge>,
    cancellation: CancellationToken,
) {
    let mut ticks = tokio::time::interval(SAMPLE_PERIOD);
    ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut previous = Level::High;

    loop {
        tokio::select! {
            _ = cancellation.cancelled() => break,
            _ = ticks.tick() => {
                let level = match line.read().await {
                    Ok(level) => level,
                    Err(e) => {
                        warn!(error = %e, "Failed to sample input line");
                        continue;
                    }
                };

                if previous == Level::High && level == Level::Low {
                    trace!("Falling edge on input line");
                    let _ = edge_tx.try_send(Edge);
                }
                previous = level;
            }
        }
    }

    trace!("Edge watcher stopped.");
}
