use std::sync::Arc;
use std::time::Instant;

use spotmon_proto::palette::Palette;
use spotmon_proto::protocol::Snapshot;
use spotmon_proto::snapshot::build_snapshot;
use spotmon_proto::state::{CachedPlayback, StateCache};
use tracing::{debug, warn};

use crate::artwork::ArtworkResolver;

/// Builds snapshots from the state cache. Shared by the broadcaster and the
/// HTTP handlers.
///
/// The cached record is cloned out first; artwork and palette work happen
/// with no lock held.
pub struct Reporter {
    cache: Arc<StateCache>,
    artwork: Arc<ArtworkResolver>,
    accent: bool,
}

impl Reporter {
    pub fn new(cache: Arc<StateCache>, artwork: Arc<ArtworkResolver>, accent: bool) -> Self {
        Self {
            cache,
            artwork,
            accent,
        }
    }

    pub fn cache(&self) -> &Arc<StateCache> {
        &self.cache
    }

    /// Snapshot of the current record, or `None` before the first poll.
    pub async fn snapshot(&self) -> Option<Snapshot> {
        let cached = self.cache.read().await?;
        Some(self.build(&cached).await)
    }

    pub async fn build(&self, cached: &CachedPlayback) -> Snapshot {
        let palette = self.palette_for(cached.record.artwork_url.as_deref()).await;
        build_snapshot(
            cached,
            &palette,
            Instant::now(),
            chrono::Utc::now().timestamp(),
        )
    }

    /// Palette for the given artwork, or the fallback palette if there is
    /// none or it cannot be used.
    pub async fn palette_for(&self, artwork_url: Option<&str>) -> Palette {
        let url = match artwork_url {
            Some(url) if !url.is_empty() => url,
            _ => return Palette::fallback(self.accent),
        };

        let pixels = match self.artwork.resolve(url).await {
            Ok(pixels) => pixels,
            Err(e) => {
                warn!("artwork {}: {}; using default colors", url, e);
                return Palette::fallback(self.accent);
            }
        };

        let accent = self.accent;
        match tokio::task::spawn_blocking(move || Palette::from_image(&pixels, accent)).await {
            Ok(palette) => {
                debug!(
                    "palette: dominant={} text={} progress={}",
                    palette.dominant,
                    palette.text,
                    palette.progress_color()
                );
                palette
            }
            Err(e) => {
                warn!("palette task failed: {}", e);
                Palette::fallback(self.accent)
            }
        }
    }
}
