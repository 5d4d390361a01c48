//! Dimension probing for fetched videos
//!
//! Probing never fails a batch: every backend answers `None` when it cannot
//! determine a size, and [`probe_or_fallback`] substitutes the configured
//! default.

use crate::media::{IntrinsicSize, VideoAsset};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod container;
#[cfg(feature = "ffmpeg")]
pub mod ffprobe;

pub use container::ContainerProber;
#[cfg(feature = "ffmpeg")]
pub use ffprobe::FfprobeProber;

/// Strategy for reading a video's intrinsic pixel size
pub trait DimensionProber: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Pixel size of the first video track, `None` if unavailable
    fn probe(&self, video: &VideoAsset) -> Option<IntrinsicSize>;
}

/// Never probes; every video gets the fallback size
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedProber;

impl DimensionProber for FixedProber {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn probe(&self, _video: &VideoAsset) -> Option<IntrinsicSize> {
        None
    }
}

/// Tries each prober in order, first answer wins
pub struct ChainProber {
    probers: Vec<Box<dyn DimensionProber>>,
}

impl ChainProber {
    pub fn new(probers: Vec<Box<dyn DimensionProber>>) -> Self {
        Self { probers }
    }
}

impl DimensionProber for ChainProber {
    fn name(&self) -> &'static str {
        "chain"
    }

    fn probe(&self, video: &VideoAsset) -> Option<IntrinsicSize> {
        self.probers.iter().find_map(|prober| {
            let size = prober.probe(video);
            if let Some(size) = size {
                tracing::debug!(backend = prober.name(), %size, "Probe succeeded");
            }
            size
        })
    }
}

/// Probe result after fallback substitution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbedSize {
    pub size: IntrinsicSize,
    /// False when `size` is the fallback
    pub probed: bool,
}

/// Probe `video`, substituting `fallback` when the backend has no answer
pub fn probe_or_fallback(
    prober: &dyn DimensionProber,
    video: &VideoAsset,
    fallback: IntrinsicSize,
) -> ProbedSize {
    if video.is_empty() {
        tracing::warn!("Empty video buffer, using fallback size {}", fallback);
        return ProbedSize {
            size: fallback,
            probed: false,
        };
    }

    match prober.probe(video) {
        Some(size) => ProbedSize { size, probed: true },
        None => {
            tracing::warn!(
                backend = prober.name(),
                "Video dimensions unavailable, using fallback size {}",
                fallback
            );
            ProbedSize {
                size: fallback,
                probed: false,
            }
        }
    }
}

/// Which prober a pipeline uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeBackend {
    /// Always use the fallback size
    Fixed,
    /// Walk MP4/MOV boxes in process
    #[default]
    Container,
    /// Ask ffprobe
    Ffprobe,
    /// Container walk, then ffprobe
    Chain,
}

impl ProbeBackend {
    /// Build the prober; ffprobe backends degrade to `container` without the
    /// `ffmpeg` feature.
    pub fn build(self, timeout: Duration) -> Box<dyn DimensionProber> {
        match self {
            ProbeBackend::Fixed => Box::new(FixedProber),
            ProbeBackend::Container => Box::new(ContainerProber),
            #[cfg(feature = "ffmpeg")]
            ProbeBackend::Ffprobe => Box::new(FfprobeProber::new(timeout)),
            #[cfg(feature = "ffmpeg")]
            ProbeBackend::Chain => Box::new(ChainProber::new(vec![
                Box::new(ContainerProber),
                Box::new(FfprobeProber::new(timeout)),
            ])),
            #[cfg(not(feature = "ffmpeg"))]
            ProbeBackend::Ffprobe | ProbeBackend::Chain => {
                let _ = timeout;
                tracing::warn!("ffmpeg feature not enabled, probing with container backend");
                Box::new(ContainerProber)
            }
        }
    }
}
