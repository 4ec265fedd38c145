use std::sync::Arc;
use std::time::Duration;

use spotmon_proto::protocol::PlaybackRecord;
use spotmon_proto::state::StateCache;
use tracing::{debug, info, warn};

use crate::spotify::PlaybackSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The cache now holds a fresh record at this revision.
    Updated(u64),
    /// Query failed; the cache was left as it was.
    Failed,
}

/// One `querying` step: ask upstream and, on success, replace the cached record.
///
/// "Nothing playing" is a successful answer and is cached as an idle record.
pub async fn poll_once<S: PlaybackSource>(source: &S, cache: &StateCache) -> PollOutcome {
    match source.current_playback().await {
        Ok(record) => {
            let record = record.unwrap_or_else(PlaybackRecord::idle);
            debug!(
                "poll: playing={} track={:?} progress={}ms",
                record.is_playing, record.track, record.progress_ms
            );
            let rev = cache.write(record).await;
            PollOutcome::Updated(rev)
        }
        Err(e) => {
            warn!("poll: error getting playback state: {}", e);
            PollOutcome::Failed
        }
    }
}

/// Polls forever: `poll_interval` after a success, `backoff` after a failure.
pub fn start<S: PlaybackSource>(
    source: S,
    cache: Arc<StateCache>,
    poll_interval: Duration,
    backoff: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Poller started (interval {:?}, backoff {:?})",
            poll_interval, backoff
        );
        loop {
            let delay = match poll_once(&source, &cache).await {
                PollOutcome::Updated(_) => poll_interval,
                PollOutcome::Failed => backoff,
            };
            tokio::time::sleep(delay).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted answers; `None` entries become 503 failures.
    struct Scripted {
        answers: Mutex<VecDeque<Option<Option<PlaybackRecord>>>>,
    }

    impl Scripted {
        fn new(answers: Vec<Option<Option<PlaybackRecord>>>) -> Self {
            Self {
                answers: Mutex::new(answers.into()),
            }
        }
    }

    impl PlaybackSource for Scripted {
        async fn current_playback(&self) -> Result<Option<PlaybackRecord>, UpstreamError> {
            let next = self.answers.lock().unwrap().pop_front().flatten();
            next.ok_or(UpstreamError::Status(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
            ))
        }
    }

    fn track(name: &str) -> PlaybackRecord {
        PlaybackRecord {
            is_playing: true,
            track: name.to_string(),
            duration_ms: 1000,
            ..PlaybackRecord::default()
        }
    }

    #[tokio::test]
    async fn test_success_replaces_cache() {
        let cache = StateCache::new();
        let source = Scripted::new(vec![Some(Some(track("a"))), Some(Some(track("b")))]);

        assert_eq!(poll_once(&source, &cache).await, PollOutcome::Updated(1));
        assert_eq!(poll_once(&source, &cache).await, PollOutcome::Updated(2));
        assert_eq!(cache.read().await.unwrap().record.track, "b");
    }

    #[tokio::test]
    async fn test_failure_keeps_stale_record() {
        let cache = StateCache::new();
        let source = Scripted::new(vec![Some(Some(track("a"))), None]);

        poll_once(&source, &cache).await;
        let before = cache.read().await.unwrap();
        assert_eq!(poll_once(&source, &cache).await, PollOutcome::Failed);
        assert_eq!(cache.read().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_failure_before_first_success_leaves_cache_empty() {
        let cache = StateCache::new();
        let source = Scripted::new(vec![None]);
        assert_eq!(poll_once(&source, &cache).await, PollOutcome::Failed);
        assert!(cache.read().await.is_none());
    }

    #[tokio::test]
    async fn test_nothing_playing_is_cached_as_idle() {
        let cache = StateCache::new();
        let source = Scripted::new(vec![Some(Some(track("a"))), Some(None)]);
        poll_once(&source, &cache).await;
        poll_once(&source, &cache).await;

        let cached = cache.read().await.unwrap();
        assert_eq!(cached.record, PlaybackRecord::idle());
        assert!(!cached.record.is_playing);
    }

    #[tokio::test]
    async fn test_loop_retries_after_backoff() {
        let cache = Arc::new(StateCache::new());
        let source = Scripted::new(vec![None, None, Some(Some(track("late")))]);
        let handle = start(
            source,
            cache.clone(),
            Duration::from_millis(5),
            Duration::from_millis(5),
        );

        let mut found = false;
        for _ in 0..200 {
            if let Some(cached) = cache.read().await {
                assert_eq!(cached.record.track, "late");
                found = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        handle.abort();
        assert!(found, "poller never recovered from failures");
    }
}
