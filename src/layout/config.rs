//! Configuration for the resolution engine

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse configuration TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Configuration options for constraint resolution
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Skip host measurement when a cached result is known to be valid
    pub measure_cache: bool,

    /// Let the solver handle ratios analytically instead of deriving them while measuring
    pub direct_resolution: bool,

    /// Upper bound on solve rounds per pass
    pub max_passes: usize,

    /// Require every node to be named and present in applied constraint sets
    pub strict_ids: bool,

    /// Sizes closer than this are considered equal
    pub size_tolerance: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            measure_cache: true,
            direct_resolution: false,
            max_passes: 4,
            strict_ids: false,
            size_tolerance: 0.01,
        }
    }
}

impl LayoutConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse a configuration from a TOML string; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Enable or disable the measurement cache
    pub fn with_measure_cache(mut self, enabled: bool) -> Self {
        self.measure_cache = enabled;
        self
    }

    /// Enable or disable analytic ratio handling
    pub fn with_direct_resolution(mut self, enabled: bool) -> Self {
        self.direct_resolution = enabled;
        self
    }

    /// Set the maximum number of solve rounds per pass
    pub fn with_max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes.max(1);
        self
    }

    /// Enable or disable strict identifiers
    pub fn with_strict_ids(mut self, strict: bool) -> Self {
        self.strict_ids = strict;
        self
    }
}
