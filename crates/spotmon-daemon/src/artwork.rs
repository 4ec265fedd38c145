//! Artwork resolver: remote image URL → decoded RGBA pixels.
//!
//! Downloaded bytes are kept in a flat directory, one file per URL path
//! (named by its SHA-256).
//! Artwork behind a given URL never changes upstream, so a file that exists
//! is used as-is: no probe, no re-download, no expiry.
//!
//! On a miss the URL is probed with `HEAD` first and only fetched when it
//! reports an `image/*` content type. Files are written to a temporary name
//! and renamed into place, so readers never see a partial download.
use std::path::{Path, PathBuf};

use image::RgbaImage;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::ArtworkError;

pub struct ArtworkResolver {
    http: Client,
    cache_dir: PathBuf,
    /// Serialises downloads so concurrent misses on one URL fetch it once.
    fetch_lock: Mutex<()>,
}

impl ArtworkResolver {
    pub fn new(http: Client, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            http,
            cache_dir: cache_dir.into(),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Local file for `reference`: SHA-256 of its URL path, hex encoded.
    ///
    /// Host and query are ignored, so one image served from different CDN
    /// hosts shares an entry; distinct paths never do.
    pub fn cache_path(&self, reference: &str) -> Result<PathBuf, ArtworkError> {
        let url = url::Url::parse(reference)
            .map_err(|_| ArtworkError::InvalidReference(reference.to_string()))?;

        let path = url.path();
        if path.trim_matches('/').is_empty() {
            return Err(ArtworkError::InvalidReference(reference.to_string()));
        }

        let digest = Sha256::digest(path.as_bytes());
        Ok(self.cache_dir.join(format!("{}.img", hex::encode(digest))))
    }

    pub async fn resolve(&self, reference: &str) -> Result<RgbaImage, ArtworkError> {
        let path = self.cache_path(reference)?;

        let bytes = match read_cached(&path).await {
            Some(bytes) => bytes,
            None => {
                let _guard = self.fetch_lock.lock().await;
                // Another caller may have fetched it while we waited.
                match read_cached(&path).await {
                    Some(bytes) => bytes,
                    None => self.fetch(reference, &path).await?,
                }
            }
        };

        decode(bytes).await
    }

    async fn fetch(&self, reference: &str, path: &Path) -> Result<Vec<u8>, ArtworkError> {
        let head = self.http.head(reference).send().await?;
        if !head.status().is_success() {
            return Err(ArtworkError::FetchFailed(format!(
                "probe returned {}",
                head.status()
            )));
        }

        let content_type = head
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(ArtworkError::NotAnImage(content_type));
        }

        let resp = self.http.get(reference).send().await?.error_for_status()?;
        let bytes = resp.bytes().await?;

        match self.store(path, &bytes).await {
            Ok(()) => info!("artwork: saved {} ({} bytes)", path.display(), bytes.len()),
            Err(e) => warn!("artwork: could not cache {}: {}", path.display(), e),
        }

        Ok(bytes.to_vec())
    }

    async fn store(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        let tmp = path.with_extension("part");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await
    }
}

async fn read_cached(path: &Path) -> Option<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            debug!("artwork: cache hit {}", path.display());
            Some(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!("artwork: unreadable cache entry {}: {}", path.display(), e);
            None
        }
    }
}

async fn decode(bytes: Vec<u8>) -> Result<RgbaImage, ArtworkError> {
    tokio::task::spawn_blocking(move || image::load_from_memory(&bytes).map(|img| img.to_rgba8()))
        .await
        .map_err(|e| ArtworkError::DecodeFailed(e.to_string()))?
        .map_err(ArtworkError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba};
    use std::io::Cursor;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn png_bytes(color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(8, 8, Rgba(color));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    async fn mount_image(server: &MockServer, route: &str, body: Vec<u8>, fetches: u64) {
        Mock::given(method("HEAD"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/png"))
            .expect(fetches)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "image/png"))
            .expect(fetches)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_second_resolve_is_a_cache_hit() {
        let server = MockServer::start().await;
        mount_image(&server, "/image/ab67616d", png_bytes([200, 10, 10, 255]), 1).await;
        let dir = tempfile::tempdir().unwrap();
        let resolver = ArtworkResolver::new(Client::new(), dir.path());
        let url = format!("{}/image/ab67616d", server.uri());

        let first = resolver.resolve(&url).await.unwrap();
        let second = resolver.resolve(&url).await.unwrap();

        assert_eq!(first.get_pixel(0, 0), &Rgba([200, 10, 10, 255]));
        assert_eq!(first, second);
        let stored = resolver.cache_path(&url).unwrap();
        assert!(stored.exists());
        assert!(!stored.with_extension("part").exists());
        server.verify().await;
    }

    #[tokio::test]
    async fn test_concurrent_misses_fetch_once() {
        let server = MockServer::start().await;
        mount_image(&server, "/image/shared", png_bytes([1, 2, 3, 255]), 1).await;
        let dir = tempfile::tempdir().unwrap();
        let resolver = std::sync::Arc::new(ArtworkResolver::new(Client::new(), dir.path()));
        let url = format!("{}/image/shared", server.uri());

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let resolver = resolver.clone();
                let url = url.clone();
                tokio::spawn(async move { resolver.resolve(&url).await.is_ok() })
            })
            .collect();
        for t in tasks {
            assert!(t.await.unwrap());
        }
        server.verify().await;
    }

    #[tokio::test]
    async fn test_existing_file_skips_network() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let resolver = ArtworkResolver::new(Client::new(), dir.path());
        let url = format!("{}/image/cached", server.uri());
        std::fs::write(resolver.cache_path(&url).unwrap(), png_bytes([9, 9, 9, 255])).unwrap();

        let img = resolver.resolve(&url).await.unwrap();
        assert_eq!(img.get_pixel(3, 3), &Rgba([9, 9, 9, 255]));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_image_is_rejected_before_download() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let resolver = ArtworkResolver::new(Client::new(), dir.path());

        let err = resolver
            .resolve(&format!("{}/page", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, ArtworkError::NotAnImage(ref ct) if ct == "text/html"));
        server.verify().await;
    }

    #[tokio::test]
    async fn test_missing_artwork_is_fetch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let resolver = ArtworkResolver::new(Client::new(), dir.path());

        let err = resolver
            .resolve(&format!("{}/image/gone", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, ArtworkError::FetchFailed(_)));
    }

    #[tokio::test]
    async fn test_corrupt_image_is_decode_failure() {
        let server = MockServer::start().await;
        mount_image(&server, "/image/corrupt", b"definitely not a png".to_vec(), 1).await;
        let dir = tempfile::tempdir().unwrap();
        let resolver = ArtworkResolver::new(Client::new(), dir.path());

        let err = resolver
            .resolve(&format!("{}/image/corrupt", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, ArtworkError::DecodeFailed(_)));
    }

    #[test]
    fn test_cache_key_comes_from_path() {
        let resolver = ArtworkResolver::new(Client::new(), "/cache");
        assert_eq!(
            resolver
                .cache_path("https://i.scdn.co/image/ab67616d0000b273?size=640")
                .unwrap(),
            PathBuf::from(
                "/cache/a01bb779ed3920b962046592ad41e450e55588e82313824310f5e7f4b58e001c.img"
            )
        );
        assert_eq!(
            resolver.cache_path("https://other.host/image/ab67616d0000b273").unwrap(),
            resolver.cache_path("https://i.scdn.co/image/ab67616d0000b273").unwrap()
        );
        let escaped = resolver.cache_path("https://evil.test/../../etc/passwd").unwrap();
        assert_eq!(escaped.parent(), Some(Path::new("/cache")));
        assert!(matches!(
            resolver.cache_path("https://i.scdn.co/"),
            Err(ArtworkError::InvalidReference(_))
        ));
        assert!(matches!(
            resolver.cache_path("not a url"),
            Err(ArtworkError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_distinct_paths_get_distinct_files() {
        let resolver = ArtworkResolver::new(Client::new(), "/cache");
        let paths: Vec<PathBuf> = [
            "https://i.scdn.co/image/a/b",
            "https://i.scdn.co/image/a_b",
            "https://i.scdn.co/image/a.b",
            "https://i.scdn.co/image/a-b",
            "https://i.scdn.co/image/a/b/",
        ]
        .iter()
        .map(|r| resolver.cache_path(r).unwrap())
        .collect();
        for (i, a) in paths.iter().enumerate() {
            for b in &paths[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[tokio::test]
    async fn test_similar_paths_keep_their_own_pixels() {
        let server = MockServer::start().await;
        mount_image(&server, "/image/a/b", png_bytes([255, 0, 0, 255]), 1).await;
        mount_image(&server, "/image/a_b", png_bytes([0, 0, 255, 255]), 1).await;
        let dir = tempfile::tempdir().unwrap();
        let resolver = ArtworkResolver::new(Client::new(), dir.path());

        let red = resolver
            .resolve(&format!("{}/image/a/b", server.uri()))
            .await
            .unwrap();
        let blue = resolver
            .resolve(&format!("{}/image/a_b", server.uri()))
            .await
            .unwrap();
        assert_eq!(red.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(blue.get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
        server.verify().await;
    }
}
