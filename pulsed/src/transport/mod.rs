//! Collector transport capability.

pub mod http;

use async_trait::async_trait;
use thiserror::Error;

/// Reasons a publish attempt can fail. Failures are logged and dropped by
/// the reporter; counts are cumulative, so a missed report is subsumed into
/// the next successful one.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("collector rejected publish: {0}")]
    Rejected(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Best-effort delivery of the cumulative count to the remote collector.
/// No delivery guarantee, no queuing of missed values.
#[async_trait]
pub trait Transport: Send {
    /// Whether the transport currently considers itself connected. When
    /// false the reporter skips the publish step entirely and retries on a
    /// later evaluation.
    fn is_connected(&self) -> bool;

    /// Publish a payload on the given topic.
    async fn send(&mut self, topic: &str, payload: &str) -> Result<(), TransportError>;
}
