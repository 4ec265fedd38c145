//! Upstream playback source: the Spotify Web API "currently playing" call.
//!
//! Token acquisition happens outside this process; the client only carries a
//! bearer token.

use std::future::Future;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use spotmon_proto::protocol::PlaybackRecord;
use tracing::debug;

use crate::error::UpstreamError;

/// Anything the poller can ask for the current playback.
///
/// `Ok(None)` means upstream answered but nothing is loaded.
pub trait PlaybackSource: Send + Sync + 'static {
    fn current_playback(
        &self,
    ) -> impl Future<Output = Result<Option<PlaybackRecord>, UpstreamError>> + Send;
}

pub struct SpotifyClient {
    http: Client,
    api_base: String,
    access_token: String,
}

impl SpotifyClient {
    pub fn new(http: Client, api_base: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    fn currently_playing_url(&self) -> String {
        format!("{}/me/player/currently-playing", self.api_base)
    }
}

impl PlaybackSource for SpotifyClient {
    async fn current_playback(&self) -> Result<Option<PlaybackRecord>, UpstreamError> {
        let resp = self
            .http
            .get(self.currently_playing_url())
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(UpstreamError::Request)?;

        let status = resp.status();
        if status == StatusCode::NO_CONTENT {
            debug!("upstream: nothing playing");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }

        let body: CurrentlyPlaying = resp.json().await.map_err(UpstreamError::Decode)?;
        Ok(body.into_record())
    }
}

// ── Wire format ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CurrentlyPlaying {
    #[serde(default)]
    is_playing: bool,
    #[serde(default)]
    progress_ms: Option<u64>,
    #[serde(default)]
    context: Option<PlaybackContext>,
    #[serde(default)]
    item: Option<Item>,
}

#[derive(Debug, Deserialize)]
struct PlaybackContext {
    #[serde(default)]
    href: Option<String>,
}

/// A track, or a podcast episode (which has a show instead of album/artists).
#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    name: String,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default)]
    album: Option<Album>,
    #[serde(default)]
    artists: Vec<Artist>,
    #[serde(default)]
    show: Option<Show>,
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
struct Album {
    #[serde(default)]
    name: String,
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Show {
    #[serde(default)]
    name: String,
    #[serde(default)]
    publisher: String,
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
struct Image {
    url: String,
}

impl CurrentlyPlaying {
    fn into_record(self) -> Option<PlaybackRecord> {
        let item = self.item?;

        let (album, album_images) = match (item.album, &item.show) {
            (Some(album), _) => (album.name, album.images),
            (None, Some(show)) => (show.name.clone(), Vec::new()),
            (None, None) => (String::new(), Vec::new()),
        };
        let artist = match (item.artists.into_iter().next(), &item.show) {
            (Some(artist), _) => artist.name,
            (None, Some(show)) => show.publisher.clone(),
            (None, None) => String::new(),
        };
        // Largest image comes first in every images array.
        let artwork_url = album_images
            .into_iter()
            .chain(item.images)
            .chain(item.show.map(|s| s.images).unwrap_or_default())
            .map(|img| img.url)
            .find(|url| !url.is_empty());

        Some(PlaybackRecord {
            is_playing: self.is_playing,
            track: item.name,
            album,
            artist,
            artwork_url,
            progress_ms: self.progress_ms.unwrap_or(0),
            duration_ms: item.duration_ms,
            endpoint: self.context.and_then(|c| c.href).unwrap_or_default(),
        })
    }
}
