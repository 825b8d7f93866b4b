//! Bevy presentation layer for dimension_plugin.
//!
//! This crate bridges the engine-independent coordinator with Bevy: entities
//! carrying [`Convertible`] are registered automatically, conversions are
//! requested through [`DirectionRequest`] messages, and each unit reached by
//! the drain gets its [`Representation`] updated.

pub mod components;
pub mod messages;
pub mod resources;
pub mod systems;

#[cfg(test)]
#[path = "plugin_test.rs"]
mod plugin_test;

use std::sync::{Mutex, PoisonError};

use bevy::prelude::*;
use dimension_plugin::{ConversionCoordinator, ConverterConfig, SetupError};

pub use components::*;
pub use messages::*;
pub use resources::*;

/// Bevy plugin for dimension shifting.
///
/// Built from a validated [`ConverterConfig`], so a bad configuration fails
/// in [`DimensionShiftPlugin::new`] rather than inside the app.
pub struct DimensionShiftPlugin {
	coordinator: Mutex<Option<ConversionCoordinator<EntityUnit>>>,
	settings: DimensionSettings,
}

impl DimensionShiftPlugin {
	pub fn new(config: &ConverterConfig) -> Result<Self, SetupError> {
		Ok(Self {
			coordinator: Mutex::new(Some(ConversionCoordinator::from_config(config)?)),
			settings: DimensionSettings::default(),
		})
	}

	/// Pause `Time<Virtual>` for the duration of each conversion.
	pub fn with_paused_virtual_time(mut self, pause: bool) -> Self {
		self.settings.pause_virtual_time = pause;
		self
	}
}

impl Plugin for DimensionShiftPlugin {
	fn build(&self, app: &mut App) {
		let coordinator = self
			.coordinator
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.take();
		let Some(coordinator) = coordinator else {
			error!("DimensionShiftPlugin was already built; skipping");
			return;
		};

		app.insert_resource(DimensionCoordinator(coordinator))
			.insert_resource(self.settings)
			.init_resource::<UnitIndex>()
			.init_resource::<VirtualTimeRestore>()
			.add_message::<DirectionRequest>()
			.add_message::<ConversionStarted>()
			.add_message::<ConversionFinished>()
			.add_systems(
				Update,
				(
					systems::register_units,
					systems::unregister_units,
					systems::drive_conversion,
					systems::handle_direction_requests,
				)
					.chain(),
			);
	}
}
