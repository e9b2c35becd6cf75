//! HTTP collector transport.

use async_trait::async_trait;

use super::{Transport, TransportError};

/// Transport that POSTs payloads to `<base_url>/<topic>` on the collector.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    /// HTTP has no standing connection; availability only shows up as a
    /// send failure, which the reporter already tolerates.
    fn is_connected(&self) -> bool {
        true
    }

    async fn send(&mut self, topic: &str, payload: &str) -> Result<(), TransportError> {
        let url = format!("{}/{}", self.base_url, topic);
        let response = self
            .client
            .post(&url)
            .body(payload.to_string())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TransportError::Rejected(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        Ok(())
    }
}
