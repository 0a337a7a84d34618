//! Match configuration loading.
//!
//! A match file is RON and embeds a full [`WorldConfig`] plus the run
//! limits the headless runner needs. Every field has a default, so an
//! empty `()` is a valid match file.

use std::path::Path;

use hexwar_core::config::WorldConfig;
use hexwar_core::world::TICK_RATE;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for match configuration loading.
#[derive(Error, Debug)]
pub enum MatchConfigError {
    /// File not found.
    #[error("Match file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read match file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse match file: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Parsed but out of range.
    #[error("Invalid match config: {0}")]
    Invalid(String),
}

/// One headless match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Label used in logs and metrics.
    pub name: String,
    /// The world to build.
    pub world: WorldConfig,
    /// Game-time limit in seconds; the match is a draw when it runs out.
    pub max_seconds: u32,
    /// Seconds between territory samples in the metrics.
    pub sample_every_secs: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            world: WorldConfig::default(),
            max_seconds: 600,
            sample_every_secs: 5,
        }
    }
}

impl MatchConfig {
    /// Load a match from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MatchConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MatchConfigError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, MatchConfigError> {
        let config: MatchConfig = ron::from_str(ron)?;
        config
            .world
            .validate()
            .map_err(|e| MatchConfigError::Invalid(e.to_string()))?;
        Ok(config)
    }

    /// Small arena preset, handy for quick runs.
    #[must_use]
    pub fn small() -> Self {
        Self {
            name: "small".to_string(),
            world: WorldConfig::small(),
            max_seconds: 300,
            ..Self::default()
        }
    }

    /// Same match with another seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.world.seed = seed;
        self
    }

    /// Same match with another time limit.
    #[must_use]
    pub fn with_max_seconds(mut self, seconds: u32) -> Self {
        self.max_seconds = seconds;
        self
    }

    /// Tick limit derived from [`Self::max_seconds`].
    #[must_use]
    pub fn max_ticks(&self) -> u64 {
        u64::from(self.max_seconds) * u64::from(TICK_RATE)
    }

    /// Ticks between territory samples; never zero.
    #[must_use]
    pub fn sample_every_ticks(&self) -> u64 {
        (u64::from(self.sample_every_secs) * u64::from(TICK_RATE)).max(1)
    }
}
