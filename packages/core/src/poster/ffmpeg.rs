//! First-frame posters decoded by ffmpeg

use super::{PlaceholderPoster, PosterGenerator, PosterImage, PosterSource};
use crate::media::{IntrinsicSize, VideoAsset};
use crate::sidecar::{self, StagedVideo};
use crate::{DeckError, DeckResult};
use image::imageops::FilterType;
use image::DynamicImage;
use std::time::Duration;

/// Relative aspect difference below which a plain resize is used
const ASPECT_TOLERANCE: f64 = 0.01;

/// Decodes the first frame, falling back to a placeholder on any failure
#[derive(Debug, Clone)]
pub struct FfmpegFramePoster {
    placeholder: PlaceholderPoster,
    timeout: Duration,
}

impl FfmpegFramePoster {
    pub fn new(placeholder: PlaceholderPoster, timeout: Duration) -> Self {
        Self {
            placeholder,
            timeout,
        }
    }

    fn extract_frame(&self, video: &VideoAsset) -> DeckResult<DynamicImage> {
        let ffmpeg = sidecar::find_ffmpeg()
            .ok_or_else(|| DeckError::MediaTool("ffmpeg not available".to_string()))?;

        let staged = StagedVideo::write(video)?;
        let frame_path = staged.output("poster.png");

        let mut cmd = std::process::Command::new(&ffmpeg);
        cmd.args(["-v", "error", "-y", "-i"])
            .arg(staged.input())
            .args(["-frames:v", "1"])
            .arg(&frame_path);

        let status = sidecar::run_with_timeout(&mut cmd, self.timeout)?;
        if !status.success() {
            return Err(DeckError::MediaTool(format!(
                "ffmpeg exited with {} while decoding first frame",
                status
            )));
        }

        Ok(image::open(&frame_path)?)
    }
}

/// Scale a decoded frame to the poster size without distorting it
fn fit_frame(frame: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let frame_aspect = frame.width() as f64 / frame.height().max(1) as f64;
    let target_aspect = width as f64 / height.max(1) as f64;

    if ((frame_aspect - target_aspect) / target_aspect).abs() <= ASPECT_TOLERANCE {
        frame.resize_exact(width, height, FilterType::Lanczos3)
    } else {
        // Centre crop when storage aspect disagrees with the probed size
        frame.resize_to_fill(width, height, FilterType::Lanczos3)
    }
}

impl PosterGenerator for FfmpegFramePoster {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn generate(&self, video: &VideoAsset, intrinsic: IntrinsicSize) -> PosterImage {
        let (width, height) = self.placeholder.target_size(intrinsic);

        match self.extract_frame(video) {
            Ok(frame) => {
                tracing::debug!(
                    frame_width = frame.width(),
                    frame_height = frame.height(),
                    width,
                    height,
                    "Decoded poster frame"
                );
                let poster = fit_frame(&frame, width, height).to_rgb8();
                PosterImage::new(poster, PosterSource::Frame)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Poster frame unavailable, using placeholder");
                self.placeholder.render(intrinsic)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_fit_frame_same_aspect() {
        let frame = DynamicImage::ImageRgb8(RgbImage::from_pixel(1280, 720, Rgb([200, 10, 10])));
        let fitted = fit_frame(&frame, 320, 180);
        assert_eq!((fitted.width(), fitted.height()), (320, 180));
    }

    #[test]
    fn test_fit_frame_crops_mismatched_aspect() {
        // Anamorphic storage: 4:3 pixels for a 16:9 display size
        let frame = DynamicImage::ImageRgb8(RgbImage::from_pixel(720, 540, Rgb([0, 128, 0])));
        let fitted = fit_frame(&frame, 320, 180);
        assert_eq!((fitted.width(), fitted.height()), (320, 180));
        let Rgb([r, g, b]) = *fitted.to_rgb8().get_pixel(160, 90);
        assert!(r < 4 && b < 4 && g.abs_diff(128) < 4);
    }

    /// Holds with or without an ffmpeg binary on the machine
    #[test]
    fn test_garbage_input_degrades_to_placeholder() {
        let generator = FfmpegFramePoster::new(PlaceholderPoster::default(), Duration::from_secs(10));
        let asset = VideoAsset::new(b"not a video".to_vec(), "video/mp4");
        let poster = generator.generate(&asset, IntrinsicSize::FALLBACK);
        assert_eq!(poster.source(), PosterSource::Placeholder);
        assert_eq!((poster.width(), poster.height()), (320, 180));
    }
}
