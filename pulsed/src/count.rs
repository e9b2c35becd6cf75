//! Shared pulse count handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// The cumulative pulse count, shared between the edge-counter task and its
/// readers.
///
/// Single-writer, multi-reader discipline: only the edge counter's settle
/// check calls [`increment`](Self::increment); everyone else takes snapshots
/// with [`load`](Self::load). Readers never compare-and-update, so a single
/// machine-word atomic is all the synchronization needed.
///
/// The count is monotonically non-decreasing for the life of the process and
/// wraps at `u32::MAX`, matching the width of the persisted record.
#[derive(Debug, Clone, Default)]
pub struct SharedCount(Arc<AtomicU32>);

impl SharedCount {
    pub fn new(initial: u32) -> Self {
        Self(Arc::new(AtomicU32::new(initial)))
    }

    /// Snapshot of the current count.
    pub fn load(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    /// Increment the count, returning the new value.
    pub fn increment(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }
}
