//! Core value types shared by the registry, drain and coordinator.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which representation a conversion targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
  /// Flat 2D representation.
  #[default]
  Planar,
  /// Full 3D representation.
  Spatial,
}

impl Direction {
  /// The other representation.
  #[inline]
  pub fn opposite(self) -> Self {
    match self {
      Self::Planar => Self::Spatial,
      Self::Spatial => Self::Planar,
    }
  }

  /// Short name for logs and UI.
  pub fn name(self) -> &'static str {
    match self {
      Self::Planar => "planar",
      Self::Spatial => "spatial",
    }
  }
}

impl fmt::Display for Direction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Stable identity of a unit kind. Units sharing a key share a group.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
  pub fn new(key: impl Into<String>) -> Self {
    Self(key.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<&str> for GroupKey {
  fn from(key: &str) -> Self {
    Self::new(key)
  }
}

impl From<String> for GroupKey {
  fn from(key: String) -> Self {
    Self(key)
  }
}

impl fmt::Display for GroupKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Coordinator state. `Idle` between conversions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConversionState {
  #[default]
  Idle,
  Converting,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
