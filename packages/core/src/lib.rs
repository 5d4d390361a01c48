pub mod config;
pub mod document;
pub mod embed;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod placement;
pub mod poster;
pub mod probe;
#[cfg(feature = "ffmpeg")]
pub mod sidecar;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::{EmbedConfig, PosterConfig};
pub use document::{Presentation, SlideTarget};
pub use embed::{embed, EmbeddedMedia};
pub use error::{DeckError, DeckResult, EmbedError};
pub use media::{IntrinsicSize, VideoAsset};
pub use pipeline::{EmbedEntry, EmbedOutput, EmbedPipeline, PlacementReport};
pub use placement::{
    place, Anchor, EmuRect, PlacementPolicy, PlacementRect, SlideGeometry, DEFAULT_PIXEL_DENSITY,
    EMU_PER_INCH,
};
pub use poster::{PlaceholderPoster, PosterBackend, PosterGenerator, PosterImage, PosterSource};
pub use probe::{DimensionProber, ProbeBackend};
