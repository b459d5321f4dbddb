//! Configuration file loading and parsing.
//!
//! Tracklet supports repository-level configuration through `.tracklet/config.toml`.
//! If no config file exists, the system falls back to sensible defaults.
//!
//! ```toml
//! [intake]
//! title_min_len = 5
//! title_max_len = 100
//!
//! [duplicates]
//! min_shared_words = 2
//! extra_stop_words = ["bug"]
//!
//! [identity]
//! user = "dana@example.com"
//!
//! [server]
//! bind = "127.0.0.1:3000"
//! store_timeout_ms = 5000
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::duplicates::DEFAULT_MIN_SHARED_WORDS;

/// Root configuration structure loaded from `.tracklet/config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackletConfig {
    /// Field length limits for new issues (optional).
    pub intake: Option<IntakeConfig>,
    /// Duplicate detection tuning (optional).
    pub duplicates: Option<DuplicatesConfig>,
    /// Default creator identity (optional).
    pub identity: Option<IdentityConfig>,
    /// API server settings (optional).
    pub server: Option<ServerConfig>,
}

/// Field length limits applied at intake.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntakeConfig {
    /// Minimum trimmed title length (default: 5).
    pub title_min_len: Option<usize>,
    /// Maximum raw title length (default: 100).
    pub title_max_len: Option<usize>,
    /// Minimum trimmed description length (default: 10).
    pub description_min_len: Option<usize>,
    /// Maximum raw description length (default: 1000).
    pub description_max_len: Option<usize>,
}

impl IntakeConfig {
    pub fn title_min_len(&self) -> usize {
        self.title_min_len.unwrap_or(5)
    }

    pub fn title_max_len(&self) -> usize {
        self.title_max_len.unwrap_or(100)
    }

    pub fn description_min_len(&self) -> usize {
        self.description_min_len.unwrap_or(10)
    }

    pub fn description_max_len(&self) -> usize {
        self.description_max_len.unwrap_or(1000)
    }
}

/// Duplicate detection configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DuplicatesConfig {
    /// Shared significant words needed to flag a title (default: 2).
    pub min_shared_words: Option<usize>,
    /// Stop words added to the built-in list (default: none).
    pub extra_stop_words: Option<Vec<String>>,
}

impl DuplicatesConfig {
    pub fn min_shared_words(&self) -> usize {
        self.min_shared_words.unwrap_or(DEFAULT_MIN_SHARED_WORDS)
    }

    pub fn extra_stop_words(&self) -> Vec<String> {
        self.extra_stop_words.clone().unwrap_or_default()
    }
}

/// Identity configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityConfig {
    /// Identity stamped on issues created from this repository.
    pub user: Option<String>,
}

/// API server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on (default: "0.0.0.0:3000").
    pub bind: Option<String>,
    /// Timeout for a single store call in milliseconds (default: 5000).
    pub store_timeout_ms: Option<u64>,
}

impl ServerConfig {
    pub fn bind(&self) -> String {
        std::env::var("TRACKLET_BIND")
            .ok()
            .or_else(|| self.bind.clone())
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
    }

    pub fn store_timeout_ms(&self) -> u64 {
        self.store_timeout_ms.unwrap_or(5000)
    }
}

impl TrackletConfig {
    /// Load configuration from `<root>/config.toml` if it exists.
    ///
    /// Returns an empty config (all sections None) if the file doesn't exist.
    /// Returns an error if the file exists but is malformed.
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = root.join("config.toml");

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config.toml")?;

        toml::from_str(&content).context("Failed to parse config.toml")
    }

    pub fn intake(&self) -> IntakeConfig {
        self.intake.clone().unwrap_or_default()
    }

    pub fn duplicates(&self) -> DuplicatesConfig {
        self.duplicates.clone().unwrap_or_default()
    }

    pub fn identity(&self) -> IdentityConfig {
        self.identity.clone().unwrap_or_default()
    }

    pub fn server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }
}
