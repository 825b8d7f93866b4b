//! Bevy components for dimension shifting.

use std::hash::{Hash, Hasher};

use bevy::prelude::*;
use dimension_plugin::{ConvertibleUnit, Direction, GroupKey};

/// Marks an entity as a convertible unit of the given kind.
///
/// The kind must be one of the configured groups. It is read once, when the
/// component is added; changing it afterwards has no effect.
///
/// # Example
/// ```ignore
/// commands.spawn((
///     Sprite::default(),
///     Convertible::new("sprite"),
/// ));
/// ```
#[derive(Component, Clone, Debug)]
pub struct Convertible {
  pub key: GroupKey,
}

impl Convertible {
  pub fn new(key: impl Into<GroupKey>) -> Self {
    Self { key: key.into() }
  }
}

/// Representation an entity was last converted to.
///
/// Written by the coordinator for each unit as the drain reaches it. Game
/// code reacts with `Changed<Representation>`.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Representation(pub Direction);

/// Registry handle for an entity. Identity is the entity alone.
#[derive(Clone, Debug)]
pub struct EntityUnit {
  pub entity: Entity,
  pub key: GroupKey,
}

impl EntityUnit {
  pub fn new(entity: Entity, key: GroupKey) -> Self {
    Self { entity, key }
  }
}

impl PartialEq for EntityUnit {
  fn eq(&self, other: &Self) -> bool {
    self.entity == other.entity
  }
}

impl Eq for EntityUnit {}

impl Hash for EntityUnit {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.entity.hash(state);
  }
}

impl ConvertibleUnit for EntityUnit {
  fn group_key(&self) -> &GroupKey {
    &self.key
  }
}
