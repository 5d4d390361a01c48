//! Remote downloads for presentations and videos

use crate::settings::ServerConfig;
use deckcast_core::media::{is_video, mime_from_path, DEFAULT_VIDEO_MIME};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),
}

/// Downloaded body and its declared type
#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// HTTP client with the configured connect and total timeouts
pub fn client(config: &ServerConfig) -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout())
        .timeout(config.fetch_timeout())
        .user_agent(concat!("deckcast/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// GET `url`, requiring a 200 response
pub async fn fetch(client: &Client, url: &str) -> Result<Fetched, FetchError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if status != StatusCode::OK {
        return Err(FetchError::Status(status));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = response.bytes().await?.to_vec();

    tracing::debug!(url, bytes = bytes.len(), content_type = ?content_type, "Fetched");
    Ok(Fetched {
        bytes,
        content_type,
    })
}

/// MIME type for a downloaded video.
///
/// An explicit type wins, then a `video/*` response type, then the URL's
/// extension, then MP4.
pub fn resolve_video_mime(explicit: Option<&str>, content_type: Option<&str>, url: &str) -> String {
    if let Some(mime) = explicit {
        return mime.to_string();
    }

    if let Some(mime) = content_type.filter(|ct| is_video(ct)) {
        return mime
            .split(';')
            .next()
            .unwrap_or(mime)
            .trim()
            .to_ascii_lowercase();
    }

    mime_from_path(url).unwrap_or(DEFAULT_VIDEO_MIME).to_string()
}
