//! Debounced edge counter.
//!
//! Converts the raw falling-edge stream from the input line into a reliable
//! monotonic pulse count using a classic two-stage debounce:
//!
//! 1. **Settle window.** An edge arms a one-shot settle timer; further edges
//!    restart it, so a burst collapses into a single check scheduled after
//!    the *last* edge. When the timer fires, the line must still be asserted
//!    or the candidate was a noise spike.
//! 2. **Minimum pulse spacing.** A candidate that survives the settle window
//!    is still discarded if it follows the previously accepted pulse too
//!    closely. The metered source cannot physically pulse that fast, so
//!    anything quicker is contact chatter.
//!
//! Neither stage has a failure mode. A burst that never holds for the settle
//! window is simply never counted; that is the debounce tradeoff, not an
//! error.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::CounterConfig;
use crate::count::SharedCount;
use crate::hw::InputLine;
use crate::tracing::prelude::*;

/// A raw falling-edge event from the input line.
///
/// Carries no data; the time that matters is when the settle check runs,
/// not when the edge fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge;

/// Queue depth for the edge channel. Deliberately shallow: edges within one
/// settle window collapse into a single check, so backlogged edges carry no
/// information.
const EDGE_QUEUE_DEPTH: usize = 8;

/// Create the edge channel connecting a line watcher to an [`EdgeCounter`].
///
/// Producers must use `try_send`; dropping an edge when the queue is full is
/// harmless for the same reason the queue is shallow.
pub fn edge_channel() -> (mpsc::Sender<Edge>, mpsc::Receiver<Edge>) {
    mpsc::channel(EDGE_QUEUE_DEPTH)
}

/// Debounced edge counter task.
///
/// Owns the receiving end of the edge channel and the only write handle to
/// the shared count. `last_pulse` is private to this task, so no
/// synchronization is needed beyond the count's own atomicity.
pub struct EdgeCounter<L: InputLine> {
    line: L,
    edge_rx: mpsc::Receiver<Edge>,
    count: SharedCount,
    settle_window: Duration,
    min_pulse_spacing: Duration,
    settle_deadline: Option<Instant>,
    last_pulse: Option<Instant>,
}

impl<L: InputLine> EdgeCounter<L> {
    pub fn new(
        line: L,
        edge_rx: mpsc::Receiver<Edge>,
        count: SharedCount,
        config: &CounterConfig,
    ) -> Self {
        Self {
            line,
            edge_rx,
            count,
            settle_window: config.settle_window,
            min_pulse_spacing: config.min_pulse_spacing,
            settle_deadline: None,
            last_pulse: None,
        }
    }

    pub async fn run(mut self, cancellation: CancellationToken) {
        trace!("Edge counter started.");

        loop {
            tokio::select! {
                _ = cancellation.cancelled() => break,
                edge = self.edge_rx.recv() => match edge {
                    Some(Edge) => self.on_edge(),
                    // All edge producers are gone; nothing left to count.
                    None => break,
                },
                _ = settle_wait(self.settle_deadline) => {
                    self.settle_deadline = None;
                    self.on_settle_timeout().await;
                }
            }
        }

        trace!("Edge counter stopped.");
    }

    /// A falling edge arrived. Restart the settle timer; never count here.
    fn on_edge(&mut self) {
        self.settle_deadline = Some(Instant::now() + self.settle_window);
    }

    /// The settle window expired. Decide whether the candidate pulse is real.
    async fn on_settle_timeout(&mut self) {
        let level = match self.line.read().await {
            Ok(level) => level,
            Err(e) => {
                warn!(error = %e, "Failed to read input line at settle check");
                return;
            }
        };

        if !level.is_asserted() {
            debug!("Candidate pulse rejected: line released within settle window");
            return;
        }

        let now = Instant::now();
        let spaced_out = self
            .last_pulse
            .map_or(true, |last| now.duration_since(last) > self.min_pulse_spacing);
        if !spaced_out {
            debug!("Candidate pulse rejected: too close to previous pulse");
            return;
        }

        self.last_pulse = Some(now);
        let total = self.count.increment();
        debug!(total, "Pulse accepted");
    }
}

/// Wait for the settle deadline, or forever when no timer is armed.
async fn settle_wait(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
