//! Turns a cached playback record into a [`Snapshot`].
//!
//! Upstream is only polled every few seconds, so the position is
//! extrapolated from the time elapsed since the record was acquired and
//! clamped to the track duration.

use std::time::Instant;

use crate::palette::Palette;
use crate::protocol::Snapshot;
use crate::state::CachedPlayback;

/// `min(progress + elapsed, duration)`.
pub fn extrapolate_progress(progress_ms: u64, duration_ms: u64, elapsed_ms: u64) -> u64 {
    progress_ms.saturating_add(elapsed_ms).min(duration_ms)
}

/// Percentage of `duration_ms` covered by `position_ms`; 0 for a zero duration.
pub fn progress_pct(position_ms: u64, duration_ms: u64) -> f64 {
    if duration_ms == 0 {
        return 0.0;
    }
    position_ms as f64 / duration_ms as f64 * 100.0
}

/// `M:SS` with whole minutes and zero-padded seconds, e.g. `200000` → `"3:20"`.
pub fn format_duration(ms: u64) -> String {
    format!("{}:{:02}", ms / 60_000, (ms / 1000) % 60)
}

/// Builds the snapshot for `cached` as seen at `now`.
///
/// `timestamp` is the wall clock (unix seconds) stamped into the output.
/// Progress advances by the time since acquisition whatever the playback
/// state.
pub fn build_snapshot(
    cached: &CachedPlayback,
    palette: &Palette,
    now: Instant,
    timestamp: i64,
) -> Snapshot {
    let record = &cached.record;

    let elapsed_ms = now.saturating_duration_since(cached.acquired_at).as_millis() as u64;
    let progress_ms = extrapolate_progress(record.progress_ms, record.duration_ms, elapsed_ms);
    let remaining_ms = record.duration_ms.saturating_sub(progress_ms);
    let pct = progress_pct(progress_ms, record.duration_ms);
    let progress_color = palette.progress_color();

    Snapshot {
        timestamp,
        playback_state: record.is_playing,
        track: record.track.clone(),
        album: record.album.clone(),
        artist: record.artist.clone(),
        endpoint: record.endpoint.clone(),
        progress_pct: pct,
        progress_pct_str: format!("{:.2}%", pct),
        progress_ms,
        duration_ms: record.duration_ms,
        remaining_ms,
        progress_str: format_duration(progress_ms),
        duration_str: format_duration(record.duration_ms),
        remaining_str: format_duration(remaining_ms),
        album_art_url: record.artwork_url.clone().unwrap_or_default(),
        album_art_color_rgb: palette.dominant.rgb_string(),
        album_art_color: palette.dominant,
        album_art_colors: palette.extracted.clone(),
        text_color_rgb: palette.text.rgb_string(),
        text_color: palette.text,
        progress_color_rgb: progress_color.rgb_string(),
        progress_color,
        harmonic_colors: palette.harmonics,
    }
}
