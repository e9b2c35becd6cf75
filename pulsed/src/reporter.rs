//! Scheduler/reporter: the dual-interval publish/persist policy.
//!
//! A periodic, non-blocking evaluation decides whether to publish the count
//! and whether to persist it. The two intervals are independent: reporting
//! runs often enough for monitoring freshness, persisting runs infrequently
//! to spare storage write endurance. A publish always forces a persist, so
//! the remote log and local storage never diverge by more than one persist
//! interval.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::CounterConfig;
use crate::count::SharedCount;
use crate::store::{CounterStore, Storage};
use crate::tracing::prelude::*;
use crate::transport::Transport;

/// How often the evaluation runs. Only elapsed time is polled here; well
/// under the persist interval so boundaries are hit promptly.
const TICK_DURATION: Duration = Duration::from_secs(1);

pub struct Reporter<S: Storage, T: Transport> {
    config: CounterConfig,
    store: CounterStore<S>,
    transport: T,
    count: SharedCount,
    last_publish: Instant,
    last_persist: Instant,
}

impl<S: Storage, T: Transport> Reporter<S, T> {
    pub fn new(
        config: CounterConfig,
        store: CounterStore<S>,
        transport: T,
        count: SharedCount,
    ) -> Self {
        let now = Instant::now();
        Self {
            config,
            store,
            transport,
            count,
            last_publish: now,
            last_persist: now,
        }
    }

    pub async fn run(mut self, cancellation: CancellationToken) {
        trace!("Reporter started.");

        let mut interval = tokio::time::interval(TICK_DURATION);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancellation.cancelled() => break,
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }

        // Last chance to capture pulses that arrived since the previous
        // persist evaluation.
        self.store.save_if_changed(self.count.load()).await;

        trace!("Reporter stopped.");
    }

    /// One evaluation step. Never blocks on anything but the capabilities
    /// themselves; a skipped publish is simply retried on a later tick.
    async fn tick(&mut self) {
        let now = Instant::now();
        let mut persist_required = false;

        if self.transport.is_connected()
            && now.duration_since(self.last_publish) >= self.config.publish_interval
        {
            let count = self.count.load();
            let payload = format!("count={count}");
            info!(count, topic = %self.config.topic, "Publishing pulse count");

            if let Err(e) = self.transport.send(&self.config.topic, &payload).await {
                // Best effort: the next publish carries the cumulative
                // total, so nothing is lost.
                warn!(error = %e, "Publish failed");
            }

            self.last_publish = now;
            // Publish always forces a persist, so the stored value reflects
            // what was last reported.
            persist_required = true;
        }

        if now.duration_since(self.last_persist) >= self.config.persist_interval {
            persist_required = true;
        }

        if persist_required {
            self.store.save_if_changed(self.count.load()).await;
            // Restarts on evaluation, not on actual write.
            self.last_persist = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use tokio::time;

    use super::*;
    use crate::store::{RECORD_MAGIC, RECORD_SIZE};
    use crate::transport::TransportError;

    // All tests use start_paused and drive tick() directly with an advanced
    // clock, scaled intervals: publish 30 s, persist 2 s.

    fn test_config() -> CounterConfig {
        CounterConfig {
            publish_interval: Duration::from_secs(30),
            persist_interval: Duration::from_secs(2),
            ..CounterConfig::default()
        }
    }

    #[derive(Clone, Default)]
    struct MemStorage {
        bytes: Arc<Mutex<Vec<u8>>>,
        writes: Arc<Mutex<usize>>,
    }

    impl MemStorage {
        fn writes(&self) -> usize {
            *self.writes.lock().unwrap()
        }

        fn stored_count(&self) -> u32 {
            let bytes = self.bytes.lock().unwrap();
            u32::from_le_bytes(bytes[4..RECORD_SIZE].try_into().unwrap())
        }
    }

    #[async_trait]
    impl Storage for MemStorage {
        async fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
            let bytes = self.bytes.lock().unwrap();
            let start = offset as usize;
            for (i, byte) in buf.iter_mut().enumerate() {
                *byte = bytes.get(start + i).copied().unwrap_or(0);
            }
            Ok(())
        }

        async fn write_at(&mut self, offset: u64, data: &[u8]) -> std::io::Result<()> {
            let mut bytes = self.bytes.lock().unwrap();
            let end = offset as usize + data.len();
            if bytes.len() < end {
                bytes.resize(end, 0);
            }
            bytes[offset as usize..end].copy_from_slice(data);
            *self.writes.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingTransport {
        connected: Arc<AtomicBool>,
        failing: Arc<AtomicBool>,
        sent: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl RecordingTransport {
        fn connected() -> Self {
            let transport = Self::default();
            transport.connected.store(true, Ordering::Relaxed);
            transport
        }

        fn attempts(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::Relaxed)
        }

        async fn send(&mut self, topic: &str, payload: &str) -> Result<(), TransportError> {
            self.sent
                .lock()
                .unwrap()
                .push((topic.to_string(), payload.to_string()));
            if self.failing.load(Ordering::Relaxed) {
                return Err(TransportError::Rejected("scripted failure".to_string()));
            }
            Ok(())
        }
    }

    async fn make_reporter(
        transport: RecordingTransport,
        initial_count: u32,
    ) -> (Reporter<MemStorage, RecordingTransport>, MemStorage, SharedCount) {
        let storage = MemStorage::default();
        let mut record = [0u8; RECORD_SIZE];
        record[..4].copy_from_slice(&RECORD_MAGIC.to_le_bytes());
        record[4..].copy_from_slice(&initial_count.to_le_bytes());
        storage.clone().write_at(0, &record).await.unwrap();
        *storage.writes.lock().unwrap() = 0;

        let (store, restored) = CounterStore::load_or_init(storage.clone(), 0).await;
        let count = SharedCount::new(restored);
        let reporter = Reporter::new(test_config(), store, transport, count.clone());
        (reporter, storage, count)
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_publish_before_publish_interval() {
        let transport = RecordingTransport::connected();
        let (mut reporter, _storage, _count) = make_reporter(transport.clone(), 0).await;

        time::advance(Duration::from_secs(29)).await;
        reporter.tick().await;

        assert!(transport.attempts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_publish_cumulative_count_after_publish_interval() {
        let transport = RecordingTransport::connected();
        let (mut reporter, _storage, count) = make_reporter(transport.clone(), 100).await;
        count.increment();
        count.increment();

        time::advance(Duration::from_secs(30)).await;
        reporter.tick().await;

        assert_eq!(
            transport.attempts(),
            vec![("bmon_store".to_string(), "count=102".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn should_skip_publish_while_disconnected_then_publish_when_connected() {
        let transport = RecordingTransport::default();
        let (mut reporter, _storage, _count) = make_reporter(transport.clone(), 0).await;

        time::advance(Duration::from_secs(45)).await;
        reporter.tick().await;
        assert!(transport.attempts().is_empty());

        // Connectivity returns: the overdue publish happens on the next
        // evaluation, no special retry path.
        transport.connected.store(true, Ordering::Relaxed);
        time::advance(Duration::from_secs(1)).await;
        reporter.tick().await;
        assert_eq!(transport.attempts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_persist_changed_count_at_persist_interval() {
        let transport = RecordingTransport::connected();
        let (mut reporter, storage, count) = make_reporter(transport, 10).await;
        count.increment();

        time::advance(Duration::from_secs(2)).await;
        reporter.tick().await;

        assert_eq!(storage.writes(), 1);
        assert_eq!(storage.stored_count(), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn should_restart_persist_interval_on_evaluation_not_on_write() {
        let transport = RecordingTransport::connected();
        let (mut reporter, storage, count) = make_reporter(transport, 0).await;

        // Unchanged count: the evaluation runs but no write is issued.
        time::advance(Duration::from_secs(2)).await;
        reporter.tick().await;
        assert_eq!(storage.writes(), 0);

        // The interval restarted anyway: a change one second later is not
        // persisted until a full interval after the last evaluation.
        count.increment();
        time::advance(Duration::from_secs(1)).await;
        reporter.tick().await;
        assert_eq!(storage.writes(), 0);

        time::advance(Duration::from_secs(1)).await;
        reporter.tick().await;
        assert_eq!(storage.writes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_skip_interval_persists_and_write_once_after_publish() {
        let transport = RecordingTransport::connected();
        let (mut reporter, storage, count) = make_reporter(transport.clone(), 0).await;

        // Drive one-second evaluations through a full publish interval.
        // Pulses arrive just before the publish boundary, so every interval
        // persist is a write-skip and the forced post-publish persist does
        // the only write.
        for second in 1..=31 {
            if second == 29 {
                count.increment();
            }
            time::advance(Duration::from_secs(1)).await;
            reporter.tick().await;
        }

        assert_eq!(transport.attempts().len(), 1);
        assert_eq!(storage.writes(), 1);
        assert_eq!(storage.stored_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_keep_counting_and_persisting_when_every_publish_fails() {
        let transport = RecordingTransport::connected();
        transport.failing.store(true, Ordering::Relaxed);
        let (mut reporter, storage, count) = make_reporter(transport.clone(), 0).await;

        for second in 1..=90 {
            if second % 10 == 0 {
                count.increment();
            }
            time::advance(Duration::from_secs(1)).await;
            reporter.tick().await;
        }

        // Publishes were attempted on cadence (the attempt restarts the
        // publish interval even when it fails)...
        assert_eq!(transport.attempts().len(), 3);
        // ...and the persisted value still tracked the live count.
        assert_eq!(count.load(), 9);
        assert_eq!(storage.stored_count(), 9);
    }
}
