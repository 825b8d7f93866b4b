//! dimension_plugin - Framework/engine independent dimension shift
//! coordination
//!
//! Flips a large population of heterogeneous units between a planar (2D) and
//! a spatial (3D) representation without stalling the host, by spreading the
//! work across scheduling ticks.
//!
//! # Features
//!
//! - **Registry**: units bucketed by kind into groups with fixed conversion
//!   order and per-direction batch sizes
//! - **Soft deadline**: after `conversion_time` the drain stops yielding and
//!   finishes the remaining work in one burst
//! - **Deferred membership**: adds/removes during a conversion apply when it
//!   commits
//! - **Hooks**: before/after notifications around each conversion
//!
//! # Example
//!
//! ```ignore
//! use dimension_plugin::{ConversionCoordinator, ConverterConfig, Direction};
//!
//! let config = ConverterConfig::load(Path::new("dimension.toml"))?;
//! let mut coordinator = ConversionCoordinator::<MyUnit>::from_config(&config)?;
//!
//! coordinator.add(unit)?;
//! coordinator.request_direction(Direction::Spatial)?;
//!
//! // Once per frame, with real (unscaled) frame time:
//! coordinator.tick(frame_delta);
//! ```

pub mod config;
pub mod coordinator;
pub mod deadline;
pub mod drain;
pub mod hooks;
pub mod registry;
pub mod stats;
pub mod types;
pub mod unit;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used items
pub use config::{ConfigError, ConversionSettings, ConverterConfig, GroupConfig};
pub use coordinator::{
  ConversionCoordinator, MutationOutcome, RequestRejected, SetupError, TickOutcome,
};
pub use hooks::{ConversionHooks, SubscriptionId};
pub use registry::{DeferredMutation, Group, Registry, RegistryError};
pub use stats::{ConversionReport, ConversionStats};
pub use types::{ConversionState, Direction, GroupKey};
pub use unit::{ConvertibleUnit, SelfConverting, UnitError};
