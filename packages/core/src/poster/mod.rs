//! Poster frames shown before an embedded video starts playing

use crate::media::{IntrinsicSize, VideoAsset};
use crate::placement::fit_to_container;
use image::{ImageFormat, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::time::Duration;

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;

#[cfg(feature = "ffmpeg")]
pub use ffmpeg::FfmpegFramePoster;

pub const DEFAULT_POSTER_WIDTH: u32 = 320;
pub const DEFAULT_POSTER_HEIGHT: u32 = 240;
pub const DEFAULT_PLACEHOLDER_COLOR: [u8; 3] = [0, 0, 255];

/// Where a poster's pixels came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PosterSource {
    /// First decoded video frame
    Frame,
    /// Solid colour fill
    Placeholder,
}

/// Still image used as the media shape's picture
#[derive(Debug, Clone)]
pub struct PosterImage {
    image: RgbImage,
    source: PosterSource,
}

impl PosterImage {
    pub fn new(image: RgbImage, source: PosterSource) -> Self {
        Self { image, source }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn source(&self) -> PosterSource {
        self.source
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Encode as PNG for the document's media folder
    pub fn to_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut buf = Vec::new();
        self.image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        Ok(buf)
    }
}

/// Strategy for producing a poster image. Implementations never fail.
pub trait PosterGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    fn generate(&self, video: &VideoAsset, intrinsic: IntrinsicSize) -> PosterImage;
}

/// Solid-colour poster sized to the video's aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderPoster {
    box_width: u32,
    box_height: u32,
    color: [u8; 3],
}

impl PlaceholderPoster {
    pub fn new(box_width: u32, box_height: u32, color: [u8; 3]) -> Self {
        Self {
            box_width: box_width.max(1),
            box_height: box_height.max(1),
            color,
        }
    }

    /// Poster pixel size for a video of `intrinsic` size
    pub fn target_size(&self, intrinsic: IntrinsicSize) -> (u32, u32) {
        fit_to_container(intrinsic.aspect_ratio(), self.box_width, self.box_height)
    }

    pub fn render(&self, intrinsic: IntrinsicSize) -> PosterImage {
        let (width, height) = self.target_size(intrinsic);
        let image = RgbImage::from_pixel(width, height, Rgb(self.color));
        PosterImage::new(image, PosterSource::Placeholder)
    }
}

impl Default for PlaceholderPoster {
    fn default() -> Self {
        Self::new(
            DEFAULT_POSTER_WIDTH,
            DEFAULT_POSTER_HEIGHT,
            DEFAULT_PLACEHOLDER_COLOR,
        )
    }
}

impl PosterGenerator for PlaceholderPoster {
    fn name(&self) -> &'static str {
        "placeholder"
    }

    fn generate(&self, _video: &VideoAsset, intrinsic: IntrinsicSize) -> PosterImage {
        self.render(intrinsic)
    }
}

/// Which poster generator a pipeline uses
///
/// Defaults to `ffmpeg` when the `ffmpeg` feature is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PosterBackend {
    Placeholder,
    /// First frame through ffmpeg, placeholder on failure
    Ffmpeg,
}

impl Default for PosterBackend {
    fn default() -> Self {
        if cfg!(feature = "ffmpeg") {
            PosterBackend::Ffmpeg
        } else {
            PosterBackend::Placeholder
        }
    }
}

impl PosterBackend {
    pub fn build(self, placeholder: PlaceholderPoster, timeout: Duration) -> Box<dyn PosterGenerator> {
        match self {
            PosterBackend::Placeholder => Box::new(placeholder),
            #[cfg(feature = "ffmpeg")]
            PosterBackend::Ffmpeg => Box::new(FfmpegFramePoster::new(placeholder, timeout)),
            #[cfg(not(feature = "ffmpeg"))]
            PosterBackend::Ffmpeg => {
                let _ = timeout;
                tracing::warn!("ffmpeg feature not enabled, using placeholder posters");
                Box::new(placeholder)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(w: u32, h: u32) -> IntrinsicSize {
        IntrinsicSize::new(w, h).unwrap()
    }

    #[test]
    fn test_placeholder_widescreen() {
        let poster = PlaceholderPoster::default().render(size(1920, 1080));
        assert_eq!((poster.width(), poster.height()), (320, 180));
        assert_eq!(poster.source(), PosterSource::Placeholder);
        assert_eq!(poster.image().get_pixel(0, 0), &Rgb([0, 0, 255]));
        assert_eq!(poster.image().get_pixel(319, 179), &Rgb([0, 0, 255]));
    }

    #[test]
    fn test_placeholder_portrait() {
        let poster = PlaceholderPoster::default().render(size(1080, 1920));
        assert_eq!((poster.width(), poster.height()), (135, 240));
    }

    #[test]
    fn test_placeholder_extreme_aspect_keeps_one_pixel() {
        let poster = PlaceholderPoster::default().render(size(10_000, 1));
        assert_eq!(poster.width(), 320);
        assert_eq!(poster.height(), 1);
    }

    #[test]
    fn test_custom_box_and_color() {
        let placeholder = PlaceholderPoster::new(100, 100, [10, 20, 30]);
        let poster = placeholder.render(size(4, 3));
        assert_eq!((poster.width(), poster.height()), (100, 75));
        assert_eq!(poster.image().get_pixel(50, 50), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_png_encoding() {
        let poster = PlaceholderPoster::default().render(size(1280, 720));
        let png = poster.to_png().unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (320, 180));
    }

    #[test]
    fn test_backend_build() {
        let timeout = Duration::from_secs(1);
        let generator = PosterBackend::Placeholder.build(PlaceholderPoster::default(), timeout);
        assert_eq!(generator.name(), "placeholder");

        let asset = VideoAsset::new(Vec::new(), "video/mp4");
        let poster = generator.generate(&asset, IntrinsicSize::FALLBACK);
        assert_eq!(poster.source(), PosterSource::Placeholder);

        let backend: PosterBackend = serde_json::from_str("\"ffmpeg\"").unwrap();
        assert_eq!(backend, PosterBackend::Ffmpeg);
    }

    #[test]
    fn test_default_backend_decodes_frames_when_available() {
        #[cfg(feature = "ffmpeg")]
        assert_eq!(PosterBackend::default(), PosterBackend::Ffmpeg);
        #[cfg(not(feature = "ffmpeg"))]
        assert_eq!(PosterBackend::default(), PosterBackend::Placeholder);
    }
}
