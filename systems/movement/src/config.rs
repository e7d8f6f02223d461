use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_SPEED: f32 = 4.0;
const DEFAULT_BOUNDARY_TOLERANCE: u32 = 1;
const DEFAULT_EVENT_POOL_CAPACITY: usize = 4;

/// Errors raised while loading a movement configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read movement config {}", path.display())]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The configuration text is not valid TOML for this schema.
    #[error("failed to parse movement config")]
    Parse(#[from] toml::de::Error),
    /// A value is outside its permitted range.
    #[error("invalid movement config: {0}")]
    Invalid(&'static str),
}

/// Configuration parameters required to construct the movement system.
///
/// Every key is optional in TOML; missing keys fall back to the defaults.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    default_speed: f32,
    boundary_tolerance: u32,
    event_pool_capacity: usize,
}

impl Config {
    /// Creates a new configuration.
    #[must_use]
    pub const fn new(default_speed: f32, boundary_tolerance: u32, event_pool_capacity: usize) -> Self {
        Self {
            default_speed,
            boundary_tolerance,
            event_pool_capacity,
        }
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_speed.is_finite() || self.default_speed <= 0.0 {
            return Err(ConfigError::Invalid("default_speed must be a positive number"));
        }
        if self.event_pool_capacity == 0 {
            return Err(ConfigError::Invalid("event_pool_capacity must be at least 1"));
        }
        Ok(())
    }

    /// Speed in tiles per second given to movers spawned without one.
    #[must_use]
    pub const fn default_speed(&self) -> f32 {
        self.default_speed
    }

    /// How many tiles past a map edge a step may target.
    #[must_use]
    pub const fn boundary_tolerance(&self) -> u32 {
        self.boundary_tolerance
    }

    /// Number of reusable event objects per event kind.
    #[must_use]
    pub const fn event_pool_capacity(&self) -> usize {
        self.event_pool_capacity
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            DEFAULT_SPEED,
            DEFAULT_BOUNDARY_TOLERANCE,
            DEFAULT_EVENT_POOL_CAPACITY,
        )
    }
}
