//! Hardware capability traits for the pulse input line.

pub mod sysfs;

use async_trait::async_trait;

/// Logic level of the input line.
///
/// The line is active-low: a pulled-up idle line reads [`High`](Level::High)
/// and a switch closure pulls it to [`Low`](Level::Low).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    High,
    Low,
}

impl Level {
    /// Whether the line is asserted (pulled low by a closure).
    pub fn is_asserted(self) -> bool {
        self == Level::Low
    }
}

/// A digital input line the counter can sample.
///
/// Edge *detection* is the line implementation's job (see
/// [`sysfs::SysfsLine`]); the debounce logic only needs to re-read the level
/// when a settle window expires.
#[async_trait]
pub trait InputLine: Send {
    /// Read the current level of the line.
    async fn read(&mut self) -> std::io::Result<Level>;
}
