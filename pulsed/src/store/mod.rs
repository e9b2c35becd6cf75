//! Persistent counter store.
//!
//! Durably remembers the pulse count across power cycles while minimizing
//! writes to the storage medium. Media of this class have bounded write
//! endurance; [`CounterStore::save_if_changed`] is the sole guard against
//! wearing them out under high-frequency scheduler polling.
//!
//! All storage failures are handled here and degrade to a safe default: an
//! unreadable or unrecognized record is treated as "never initialized", and
//! a failed write leaves the cache untouched so the next persist evaluation
//! retries. Nothing propagates to callers.

pub mod file;

use async_trait::async_trait;

use crate::tracing::prelude::*;

/// Sentinel marking an initialized record. Anything else (all-zero blank
/// storage included) means no prior valid count.
pub const RECORD_MAGIC: u32 = 0x797b_0d25;

/// On-medium size of a [`PersistedRecord`]: magic + count, little-endian.
pub const RECORD_SIZE: usize = 8;

/// The record stored at a fixed offset in the storage medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistedRecord {
    pub magic: u32,
    pub count: u32,
}

impl PersistedRecord {
    fn new(count: u32) -> Self {
        Self {
            magic: RECORD_MAGIC,
            count,
        }
    }

    fn is_valid(&self) -> bool {
        self.magic == RECORD_MAGIC
    }

    fn to_bytes(self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];
        bytes[..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..].copy_from_slice(&self.count.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: [u8; RECORD_SIZE]) -> Self {
        Self {
            magic: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            count: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }
}

/// The storage medium capability: fixed-offset reads and writes of a small
/// record. Assumed atomic enough for [`RECORD_SIZE`] bytes; there is no
/// corruption-repair logic beyond the magic check.
#[async_trait]
pub trait Storage: Send {
    async fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> std::io::Result<()>;
    async fn write_at(&mut self, offset: u64, bytes: &[u8]) -> std::io::Result<()>;
}

/// Wraps the storage capability with a cached copy of the last record
/// written, so unchanged counts never touch the medium.
pub struct CounterStore<S: Storage> {
    storage: S,
    offset: u64,
    cache: PersistedRecord,
}

impl<S: Storage> CounterStore<S> {
    /// Read the persisted record, or initialize a fresh one.
    ///
    /// Returns the store and the count to resume from. Called exactly once,
    /// at startup, before any edge events are processed. A missing, blank,
    /// or unreadable record is not an error: the count restarts at zero and
    /// a valid record is written in its place.
    pub async fn load_or_init(mut storage: S, offset: u64) -> (Self, u32) {
        let mut bytes = [0u8; RECORD_SIZE];
        let record = match storage.read_at(offset, &mut bytes).await {
            Ok(()) => PersistedRecord::from_bytes(bytes),
            Err(e) => {
                warn!(error = %e, "Failed to read persisted record, treating as uninitialized");
                PersistedRecord { magic: 0, count: 0 }
            }
        };

        let cache = if record.is_valid() {
            info!(count = record.count, "Restored pulse count");
            record
        } else {
            let fresh = PersistedRecord::new(0);
            if let Err(e) = storage.write_at(offset, &fresh.to_bytes()).await {
                warn!(error = %e, "Failed to initialize persisted record");
            } else {
                info!("Initialized persisted record");
            }
            fresh
        };

        let count = cache.count;
        (
            Self {
                storage,
                offset,
                cache,
            },
            count,
        )
    }

    /// Write the count to storage if it differs from the last record
    /// written. Returns whether a durable write occurred.
    ///
    /// Idempotent: repeated calls with an unchanged count never issue
    /// additional writes.
    pub async fn save_if_changed(&mut self, count: u32) -> bool {
        if count == self.cache.count {
            debug!(count, "Pulse count unchanged since last store, skipping write");
            return false;
        }

        let record = PersistedRecord::new(count);
        match self.storage.write_at(self.offset, &record.to_bytes()).await {
            Ok(()) => {
                self.cache = record;
                info!(count, "Persisted pulse count");
                true
            }
            Err(e) => {
                // Cache untouched: the next persist evaluation retries.
                warn!(error = %e, count, "Failed to persist pulse count");
                false
            }
        }
    }

    /// The count in the last record successfully written (or adopted at
    /// startup).
    pub fn persisted_count(&self) -> u32 {
        self.cache.count
    }
}
