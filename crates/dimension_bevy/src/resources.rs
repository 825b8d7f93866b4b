//! Bevy resources for dimension shift management.

use std::collections::HashMap;

use bevy::prelude::*;
use dimension_plugin::{ConversionCoordinator, GroupKey};

use crate::components::EntityUnit;

/// Resource wrapping the coordinator for all convertible entities.
///
/// Hooks can be subscribed through it directly:
///
/// ```ignore
/// fn setup(coordinator: Res<DimensionCoordinator>) {
///     coordinator.subscribe_after(|direction| info!("now {direction}"));
/// }
/// ```
#[derive(Resource, Deref, DerefMut)]
pub struct DimensionCoordinator(pub ConversionCoordinator<EntityUnit>);

/// Bridge behaviour switches.
#[derive(Resource, Clone, Copy, Debug, Default)]
pub struct DimensionSettings {
  /// Pause `Time<Virtual>` while a conversion is in flight.
  pub pause_virtual_time: bool,
}

/// Pause state of `Time<Virtual>` from before the in-flight conversion.
///
/// `None` when the conversion did not pause virtual time.
#[derive(Resource, Default, Debug)]
pub struct VirtualTimeRestore {
  pub was_paused: Option<bool>,
}

/// Resource mapping registered entities to their group key.
///
/// `RemovedComponents` only yields the entity, so the key needed to find its
/// group is kept here.
#[derive(Resource, Default)]
pub struct UnitIndex {
  map: HashMap<Entity, GroupKey>,
}

impl UnitIndex {
  pub fn insert(&mut self, entity: Entity, key: GroupKey) {
    self.map.insert(entity, key);
  }

  pub fn remove(&mut self, entity: Entity) -> Option<GroupKey> {
    self.map.remove(&entity)
  }

  pub fn get(&self, entity: Entity) -> Option<&GroupKey> {
    self.map.get(&entity)
  }

  pub fn contains(&self, entity: Entity) -> bool {
    self.map.contains_key(&entity)
  }

  pub fn len(&self) -> usize {
    self.map.len()
  }

  pub fn is_empty(&self) -> bool {
    self.map.is_empty()
  }
}
