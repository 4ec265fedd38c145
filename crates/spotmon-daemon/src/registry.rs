use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

/// Frames buffered per subscriber before it counts as failed.
pub const SUBSCRIBER_QUEUE: usize = 8;

pub type SubscriberId = u64;

/// Outbound frame, shared by every subscriber of a tick.
pub type Frame = Arc<str>;

/// Result of one fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// Connected push subscribers.
///
/// Each subscriber is a bounded queue drained by its connection task.
/// Fan-out copies the current set out of the lock and delivers without it,
/// so connects and disconnects never wait on delivery.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<Frame>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscriber; the receiver yields every frame delivered to it and
    /// ends once the subscriber is removed.
    pub async fn register(&self) -> (SubscriberId, mpsc::Receiver<Frame>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE);
        let count = {
            let mut guard = self.subscribers.write().await;
            guard.insert(id, tx);
            guard.len()
        };
        info!("Subscriber {} connected ({} total)", id, count);
        (id, rx)
    }

    /// Removes a subscriber. Returns `true` only for the call that actually
    /// removed it, so racing removals are counted once.
    pub async fn remove(&self, id: SubscriberId) -> bool {
        let (removed, count) = {
            let mut guard = self.subscribers.write().await;
            let removed = guard.remove(&id).is_some();
            (removed, guard.len())
        };
        if removed {
            info!("Subscriber {} removed ({} left)", id, count);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    #[cfg(test)]
    pub async fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.read().await.contains_key(&id)
    }

    /// Queues `frame` for every subscriber. A subscriber whose queue is full
    /// or closed is removed on the spot; its connection then shuts down.
    pub async fn deliver(&self, frame: Frame) -> DeliveryReport {
        let targets: Vec<(SubscriberId, mpsc::Sender<Frame>)> = self
            .subscribers
            .read()
            .await
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut report = DeliveryReport::default();
        for (id, tx) in targets {
            match tx.try_send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    debug!("Subscriber {} delivery failed: {}", id, e);
                    if self.remove(id).await {
                        report.dropped += 1;
                    }
                }
            }
        }
        report
    }
}
