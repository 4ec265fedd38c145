use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::registry::{DeliveryReport, Frame, SubscriberRegistry};
use crate::reporter::Reporter;
use crate::webhook::WebhookSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing cached yet, or playback is not active.
    Idle,
    /// The snapshot could not be serialised; nothing was sent.
    Skipped,
    Sent(DeliveryReport),
}

/// Pushes a fresh snapshot to every subscriber (and the webhook) while
/// something is playing.
pub struct Broadcaster {
    reporter: Arc<Reporter>,
    registry: Arc<SubscriberRegistry>,
    webhook: Option<Arc<WebhookSink>>,
}

impl Broadcaster {
    pub fn new(
        reporter: Arc<Reporter>,
        registry: Arc<SubscriberRegistry>,
        webhook: Option<Arc<WebhookSink>>,
    ) -> Self {
        Self {
            reporter,
            registry,
            webhook,
        }
    }

    pub async fn tick(&self) -> TickOutcome {
        let cached = match self.reporter.cache().read().await {
            Some(cached) if cached.record.is_playing => cached,
            _ => return TickOutcome::Idle,
        };

        let snapshot = self.reporter.build(&cached).await;
        let frame: Frame = match serde_json::to_string(&snapshot) {
            Ok(json) => Arc::from(json),
            Err(e) => {
                warn!("broadcast: error marshaling snapshot: {}", e);
                return TickOutcome::Skipped;
            }
        };

        if let Some(webhook) = &self.webhook {
            webhook.spawn_post(frame.clone());
        }

        let report = self.registry.deliver(frame).await;
        if report.dropped > 0 {
            debug!(
                "broadcast: {} delivered, {} dropped, {} subscribed",
                report.delivered,
                report.dropped,
                self.registry.len().await
            );
        }
        TickOutcome::Sent(report)
    }

    pub fn start(self, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!("Broadcaster started (interval {:?})", interval);
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.tick().await;
            }
        })
    }
}
