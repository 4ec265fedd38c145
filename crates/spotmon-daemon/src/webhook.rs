use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::WebhookError;
use crate::registry::Frame;

/// Optional outbound sink: each broadcast frame is POSTed once, no retries.
pub struct WebhookSink {
    http: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn post(&self, frame: Frame) -> Result<(), WebhookError> {
        let resp = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(frame.to_string())
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(WebhookError::Status(resp.status()));
        }
        Ok(())
    }

    /// Fire-and-forget `post` on its own task; failures are only logged.
    pub fn spawn_post(self: &Arc<Self>, frame: Frame) {
        let sink = Arc::clone(self);
        tokio::spawn(async move {
            match sink.post(frame).await {
                Ok(()) => debug!("webhook: current status reported"),
                Err(e) => warn!("webhook {}: {}", sink.url, e),
            }
        });
    }
}
