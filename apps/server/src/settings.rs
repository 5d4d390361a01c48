//! Server settings: listener, remote fetching and the embed pipeline
//!
//! Read from `$DECKCAST_CONFIG`, else the per-user `config.json`, else
//! built-in defaults. `DECKCAST_BIND` overrides the listen address.

use anyhow::{Context, Result};
use deckcast_core::config::default_config_path;
use deckcast_core::EmbedConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "DECKCAST_CONFIG";
pub const BIND_ENV: &str = "DECKCAST_BIND";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub connect_timeout_secs: u64,
    /// Whole-request limit for each download
    pub fetch_timeout_secs: u64,
    /// Largest accepted request body
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
            connect_timeout_secs: 10,
            fetch_timeout_secs: 120,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub embed: EmbedConfig,
}

impl Settings {
    /// Resolve settings from the environment and the config file
    pub fn load() -> Result<Self> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut settings = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let path = default_config_path();
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    tracing::debug!("No config file at {}, using defaults", path.display());
                    Self::default()
                }
            }
        };

        if let Ok(bind) = std::env::var(BIND_ENV) {
            settings.server.bind = bind;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let settings: Self = serde_json::from_str(&json)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;
        if self.server.connect_timeout_secs == 0 || self.server.fetch_timeout_secs == 0 {
            anyhow::bail!("Fetch timeouts must be greater than 0");
        }
        if self.server.body_limit_bytes == 0 {
            anyhow::bail!("Body limit must be greater than 0");
        }
        self.embed.validate()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .with_context(|| format!("Invalid bind address {:?}", self.server.bind))
    }
}
