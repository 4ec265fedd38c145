use thiserror::Error;

/// The upstream "currently playing" query failed. Transient: the poller
/// backs off and keeps serving the previous record.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("upstream returned {0}")]
    Status(reqwest::StatusCode),
    #[error("could not decode upstream response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Artwork could not be turned into pixels. Callers fall back to the default
/// palette for that snapshot.
#[derive(Debug, Error)]
pub enum ArtworkError {
    #[error("invalid artwork reference {0:?}")]
    InvalidReference(String),
    #[error("artwork is not an image (content-type {0:?})")]
    NotAnImage(String),
    #[error("artwork fetch failed: {0}")]
    FetchFailed(String),
    #[error("artwork decode failed: {0}")]
    DecodeFailed(String),
}

impl From<reqwest::Error> for ArtworkError {
    fn from(e: reqwest::Error) -> Self {
        ArtworkError::FetchFailed(e.to_string())
    }
}

impl From<image::ImageError> for ArtworkError {
    fn from(e: image::ImageError) -> Self {
        ArtworkError::DecodeFailed(e.to_string())
    }
}

/// The webhook POST did not go through. Logged only.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("webhook returned {0}")]
    Status(reqwest::StatusCode),
}
