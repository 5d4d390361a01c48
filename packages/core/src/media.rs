//! Media inputs for the embed pipeline
//!
//! A [`VideoAsset`] is the fetched video plus its declared MIME type. The
//! MIME helpers map between declared types, file extensions and the
//! extensions PowerPoint accepts for embedded media parts.

use serde::{Deserialize, Serialize};

/// MIME type assumed when nothing better is known
pub const DEFAULT_VIDEO_MIME: &str = "video/mp4";

/// Fetched video bytes with their declared MIME type
#[derive(Debug, Clone)]
pub struct VideoAsset {
    data: Vec<u8>,
    mime_type: String,
}

impl VideoAsset {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Raw container bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// File extension for the declared MIME type, `mp4` when unknown
    pub fn extension(&self) -> &'static str {
        video_extension(&self.mime_type).unwrap_or("mp4")
    }
}

/// Intrinsic pixel dimensions of a video track. Both sides are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSize")]
pub struct IntrinsicSize {
    width_px: u32,
    height_px: u32,
}

#[derive(Deserialize)]
struct RawSize {
    width_px: u32,
    height_px: u32,
}

impl TryFrom<RawSize> for IntrinsicSize {
    type Error = String;

    fn try_from(raw: RawSize) -> Result<Self, Self::Error> {
        IntrinsicSize::new(raw.width_px, raw.height_px).ok_or_else(|| {
            format!(
                "video size must be non-zero, got {}x{}",
                raw.width_px, raw.height_px
            )
        })
    }
}

impl IntrinsicSize {
    /// Full HD, used when probing yields nothing
    pub const FALLBACK: IntrinsicSize = IntrinsicSize {
        width_px: 1920,
        height_px: 1080,
    };

    /// Returns `None` if either side is zero
    pub fn new(width_px: u32, height_px: u32) -> Option<Self> {
        if width_px == 0 || height_px == 0 {
            return None;
        }
        Some(Self {
            width_px,
            height_px,
        })
    }

    pub fn width_px(&self) -> u32 {
        self.width_px
    }

    pub fn height_px(&self) -> u32 {
        self.height_px
    }

    /// Width over height
    pub fn aspect_ratio(&self) -> f64 {
        self.width_px as f64 / self.height_px as f64
    }
}

impl Default for IntrinsicSize {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl std::fmt::Display for IntrinsicSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width_px, self.height_px)
    }
}

/// Extension used for the media part of a supported video MIME type.
///
/// Returns `None` for types PowerPoint cannot play back.
pub fn video_extension(mime: &str) -> Option<&'static str> {
    let mime = mime
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "video/mp4" => Some("mp4"),
        "video/x-m4v" => Some("m4v"),
        "video/quicktime" => Some("mov"),
        "video/x-msvideo" | "video/avi" => Some("avi"),
        "video/x-ms-wmv" => Some("wmv"),
        "video/mpeg" => Some("mpg"),
        "video/webm" => Some("webm"),
        "video/x-matroska" => Some("mkv"),
        "video/ogg" => Some("ogv"),
        _ => None,
    }
}

/// Guess a video MIME type from a file name or URL path.
pub fn mime_from_path(path: &str) -> Option<&'static str> {
    let path = path.split(['?', '#']).next().unwrap_or("");
    let file = path.rsplit('/').next().unwrap_or("");
    let ext = file.rsplit_once('.')?.1.to_ascii_lowercase();

    match ext.as_str() {
        "mp4" => Some("video/mp4"),
        "m4v" => Some("video/x-m4v"),
        "mov" => Some("video/quicktime"),
        "avi" => Some("video/x-msvideo"),
        "wmv" => Some("video/x-ms-wmv"),
        "mpg" | "mpeg" => Some("video/mpeg"),
        "webm" => Some("video/webm"),
        "mkv" => Some("video/x-matroska"),
        "ogv" => Some("video/ogg"),
        _ => None,
    }
}

/// Whether a MIME type is for video.
pub fn is_video(mime: &str) -> bool {
    mime.trim().to_ascii_lowercase().starts_with("video/")
}
