use serde::{Deserialize, Serialize};

use crate::color::{Color, Harmonics};

/// One answer from the upstream "currently playing" query.
///
/// Records are replaced wholesale on every successful poll and never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PlaybackRecord {
    pub is_playing: bool,
    pub track: String,
    pub album: String,
    pub artist: String,
    /// Remote artwork URL, if the item has any.
    pub artwork_url: Option<String>,
    /// Position inside the track when the record was acquired.
    pub progress_ms: u64,
    pub duration_ms: u64,
    /// Identifier of the playback context (album, playlist, ...) upstream.
    pub endpoint: String,
}

impl PlaybackRecord {
    /// Record used when upstream reports that nothing is loaded.
    pub fn idle() -> Self {
        Self::default()
    }
}

/// A fully computed, renderable view of playback at one instant.
///
/// This is the JSON object pushed to WebSocket subscribers and POSTed to the
/// webhook. Field names are part of the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unix time (seconds) the snapshot was built.
    pub timestamp: i64,
    pub playback_state: bool,
    pub track: String,
    pub album: String,
    pub artist: String,
    pub endpoint: String,
    pub progress_pct: f64,
    /// Two decimals plus `%`, e.g. `"30.00%"`.
    pub progress_pct_str: String,
    pub progress_ms: u64,
    pub duration_ms: u64,
    pub remaining_ms: u64,
    pub progress_str: String,
    pub duration_str: String,
    pub remaining_str: String,
    /// Empty when the item has no artwork.
    pub album_art_url: String,
    pub album_art_color_rgb: String,
    pub album_art_color: Color,
    pub album_art_colors: Vec<Color>,
    pub text_color_rgb: String,
    pub text_color: Color,
    pub progress_color_rgb: String,
    pub progress_color: Color,
    pub harmonic_colors: Harmonics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_record_is_not_playing() {
        let idle = PlaybackRecord::idle();
        assert!(!idle.is_playing);
        assert!(idle.artwork_url.is_none());
        assert_eq!(idle.duration_ms, 0);
    }
}
