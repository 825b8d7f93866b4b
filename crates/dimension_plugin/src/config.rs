//! Configuration for the conversion coordinator.
//!
//! Loaded once at startup. Group order in the file is conversion order.
//!
//! ```toml
//! conversion_time = 0.5
//! batched = true
//! initial_direction = "planar"
//!
//! [[groups]]
//! key = "collider"
//! batch_planar = 32
//! batch_spatial = 16
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Direction, GroupKey};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },
  #[error("failed to parse config TOML: {0}")]
  Parse(#[from] toml::de::Error),
  #[error("config must have at least one group")]
  NoGroups,
  #[error("conversion_time must be finite and non-negative, got {0}")]
  InvalidConversionTime(f32),
}

/// Root configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConverterConfig {
  /// Soft deadline in seconds. After it elapses the drain stops suspending.
  #[serde(default = "default_conversion_time")]
  pub conversion_time: f32,
  /// Spread work across ticks (`true`) or convert everything in one call.
  #[serde(default = "default_batched")]
  pub batched: bool,
  /// Committed direction before the first conversion.
  #[serde(default)]
  pub initial_direction: Direction,
  /// Groups in conversion order.
  pub groups: Vec<GroupConfig>,
}

/// Configuration for one group of same-kind units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
  pub key: GroupKey,
  /// Units converted per tick when converting to planar.
  #[serde(default = "default_batch_size")]
  pub batch_planar: usize,
  /// Units converted per tick when converting to spatial.
  #[serde(default = "default_batch_size")]
  pub batch_spatial: usize,
}

fn default_conversion_time() -> f32 {
  0.5
}

fn default_batched() -> bool {
  true
}

fn default_batch_size() -> usize {
  16
}

impl GroupConfig {
  pub fn new(key: impl Into<GroupKey>, batch_planar: usize, batch_spatial: usize) -> Self {
    Self {
      key: key.into(),
      batch_planar,
      batch_spatial,
    }
  }
}

impl ConverterConfig {
  /// Config with default timing over the given groups.
  pub fn with_groups(groups: Vec<GroupConfig>) -> Self {
    Self {
      conversion_time: default_conversion_time(),
      batched: default_batched(),
      initial_direction: Direction::default(),
      groups,
    }
  }

  /// Load configuration from a TOML file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.display().to_string(),
      source,
    })?;
    Self::from_toml_str(&content)
  }

  /// Parse and validate configuration from TOML text.
  pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
    let config: ConverterConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  /// Check scalar settings. Duplicate group keys are rejected later, when
  /// the registry is built.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.groups.is_empty() {
      return Err(ConfigError::NoGroups);
    }
    if !self.conversion_time.is_finite() || self.conversion_time < 0.0 {
      return Err(ConfigError::InvalidConversionTime(self.conversion_time));
    }
    Ok(())
  }

  /// Timing settings for the coordinator.
  pub fn settings(&self) -> Result<ConversionSettings, ConfigError> {
    let conversion_time = Duration::try_from_secs_f32(self.conversion_time)
      .map_err(|_| ConfigError::InvalidConversionTime(self.conversion_time))?;
    Ok(ConversionSettings {
      conversion_time,
      batched: self.batched,
      initial_direction: self.initial_direction,
    })
  }
}

/// Validated timing settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConversionSettings {
  /// Soft deadline for a conversion.
  pub conversion_time: Duration,
  /// Whether the drain suspends between batches.
  pub batched: bool,
  /// Committed direction before the first conversion.
  pub initial_direction: Direction,
}

impl Default for ConversionSettings {
  fn default() -> Self {
    Self {
      conversion_time: Duration::from_secs_f32(default_conversion_time()),
      batched: default_batched(),
      initial_direction: Direction::default(),
    }
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
