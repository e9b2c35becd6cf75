use std::time::Duration;

/// Counter timing configuration.
///
/// Fixed at startup and read-only afterward. The defaults are the values the
/// deployed meters run with; tests scale them down.
#[derive(Debug, Clone)]
pub struct CounterConfig {
    /// Interval between reports of the cumulative count to the collector.
    pub publish_interval: Duration,

    /// Maximum time between durable writes of the count. Kept well below
    /// `publish_interval` so a power loss costs at most a couple of minutes
    /// of pulses.
    pub persist_interval: Duration,

    /// Delay after a detected edge before confirming the line is still
    /// asserted. Rejects narrow noise spikes.
    pub settle_window: Duration,

    /// Shortest allowed time between two accepted pulses. Rejects contact
    /// chatter that survives the settle window; the metered source cannot
    /// physically pulse faster than this.
    pub min_pulse_spacing: Duration,

    /// Topic the cumulative count is published on.
    pub topic: String,

    /// Byte offset of the persisted record within the storage medium.
    pub storage_offset: u64,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            publish_interval: Duration::from_secs(30 * 60),
            persist_interval: Duration::from_secs(2 * 60),
            settle_window: Duration::from_millis(20),
            min_pulse_spacing: Duration::from_millis(700),
            topic: "bmon_store".to_string(),
            storage_offset: 0,
        }
    }
}
