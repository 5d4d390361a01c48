//! Pipeline configuration
//!
//! Stored as JSON. Missing fields take their defaults, so an empty object is
//! a valid configuration.

use crate::media::IntrinsicSize;
use crate::placement::PlacementPolicy;
use crate::poster::{
    PlaceholderPoster, PosterBackend, DEFAULT_PLACEHOLDER_COLOR, DEFAULT_POSTER_HEIGHT,
    DEFAULT_POSTER_WIDTH,
};
use crate::probe::ProbeBackend;
use crate::{DeckError, DeckResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MEDIA_TIMEOUT_SECS: u64 = 30;

/// Poster bounding box and placeholder fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PosterConfig {
    pub width: u32,
    pub height: u32,
    /// RGB fill for placeholder posters
    pub color: [u8; 3],
}

impl Default for PosterConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_POSTER_WIDTH,
            height: DEFAULT_POSTER_HEIGHT,
            color: DEFAULT_PLACEHOLDER_COLOR,
        }
    }
}

impl PosterConfig {
    pub fn placeholder(&self) -> PlaceholderPoster {
        PlaceholderPoster::new(self.width, self.height, self.color)
    }
}

/// Everything that shapes how a batch is embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    pub placement: PlacementPolicy,
    /// Size assumed when probing yields nothing
    pub fallback_size: IntrinsicSize,
    pub poster: PosterConfig,
    pub probe_backend: ProbeBackend,
    pub poster_backend: PosterBackend,
    /// Upper bound for each ffprobe/ffmpeg run
    pub media_timeout_secs: u64,
    /// Fetch ffmpeg at startup when it is not installed
    pub download_ffmpeg: bool,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            placement: PlacementPolicy::default(),
            fallback_size: IntrinsicSize::FALLBACK,
            poster: PosterConfig::default(),
            probe_backend: ProbeBackend::default(),
            poster_backend: PosterBackend::default(),
            media_timeout_secs: DEFAULT_MEDIA_TIMEOUT_SECS,
            download_ffmpeg: false,
        }
    }
}

impl EmbedConfig {
    pub fn media_timeout(&self) -> Duration {
        Duration::from_secs(self.media_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> DeckResult<()> {
        let placement = &self.placement;
        if !(placement.pixel_density.is_finite() && placement.pixel_density > 0.0) {
            return Err(DeckError::Configuration(
                "Pixel density must be greater than 0".to_string(),
            ));
        }
        if !(placement.margin_factor > 0.0 && placement.margin_factor < 1.0) {
            return Err(DeckError::Configuration(
                "Margin factor must be between 0 and 1 (exclusive)".to_string(),
            ));
        }
        if let Some(max_width) = placement.max_width_inches {
            if !(max_width.is_finite() && max_width > 0.0) {
                return Err(DeckError::Configuration(
                    "Maximum width must be greater than 0".to_string(),
                ));
            }
        }
        if self.poster.width == 0 || self.poster.height == 0 {
            return Err(DeckError::Configuration(
                "Poster size must be greater than 0".to_string(),
            ));
        }
        if self.media_timeout_secs == 0 {
            return Err(DeckError::Configuration(
                "Media timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Load and validate a JSON configuration file
    pub fn load_from_file(path: &Path) -> DeckResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> DeckResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Per-user configuration directory
pub fn config_dir() -> PathBuf {
    directories::ProjectDirs::from("dev", "deckcast", "deckcast")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("deckcast"))
}

/// Default location of `config.json`
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.json")
}
