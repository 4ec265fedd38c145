use crate::protocol::PlaybackRecord;
use std::time::Instant;
use tokio::sync::RwLock;

/// The cached record plus when it was acquired.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPlayback {
    /// Incremented on every write, starting at 1.
    pub rev: u64,
    pub record: PlaybackRecord,
    /// Monotonic clock reading taken while the write lock was held.
    pub acquired_at: Instant,
}

/// Holds the latest playback record, shared between the poller (single
/// writer), the broadcaster and HTTP handlers.
///
/// Writes replace the whole entry; reads clone it out. Neither holds the lock
/// for anything but the swap or the clone.
#[derive(Debug, Default)]
pub struct StateCache {
    inner: RwLock<Option<CachedPlayback>>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cached record and stamps it with the current time.
    /// Returns the new revision.
    pub async fn write(&self, record: PlaybackRecord) -> u64 {
        let mut guard = self.inner.write().await;
        let rev = guard.as_ref().map_or(0, |c| c.rev) + 1;
        *guard = Some(CachedPlayback {
            rev,
            record,
            acquired_at: Instant::now(),
        });
        rev
    }

    /// The current entry, or `None` before the first successful write.
    pub async fn read(&self) -> Option<CachedPlayback> {
        self.inner.read().await.clone()
    }
}
