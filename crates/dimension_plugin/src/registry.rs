//! Registry of convertible units bucketed by kind.
//!
//! Group shape (keys, order, batch sizes) is fixed at construction. Member
//! sets change for the lifetime of the registry. Membership is insertion
//! ordered so batch boundaries are reproducible.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::config::GroupConfig;
use crate::types::{Direction, GroupKey};
use crate::unit::ConvertibleUnit;

/// Registry construction and lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
  /// The same key was registered twice.
  #[error("group `{0}` is already registered")]
  DuplicateGroup(GroupKey),
  /// A unit's kind was never registered.
  #[error("no group registered for unit kind `{0}`")]
  UnknownGroup(GroupKey),
}

// =============================================================================
// Group
// =============================================================================

/// Ordered bucket of same-kind units sharing batch configuration.
#[derive(Debug, Clone)]
pub struct Group<U> {
  key: GroupKey,
  order: usize,
  batch_planar: usize,
  batch_spatial: usize,
  members: Vec<U>,
  index: HashSet<U>,
}

impl<U: ConvertibleUnit> Group<U> {
  fn new(key: GroupKey, order: usize, batch_planar: usize, batch_spatial: usize) -> Self {
    Self {
      key,
      order,
      batch_planar,
      batch_spatial,
      members: Vec::new(),
      index: HashSet::new(),
    }
  }

  pub fn key(&self) -> &GroupKey {
    &self.key
  }

  /// Position in conversion order.
  pub fn order(&self) -> usize {
    self.order
  }

  /// Units converted before the drain suspends, for the given direction.
  #[inline]
  pub fn batch_size(&self, direction: Direction) -> usize {
    match direction {
      Direction::Planar => self.batch_planar,
      Direction::Spatial => self.batch_spatial,
    }
  }

  /// Members in insertion order.
  pub fn members(&self) -> &[U] {
    &self.members
  }

  pub fn len(&self) -> usize {
    self.members.len()
  }

  pub fn is_empty(&self) -> bool {
    self.members.is_empty()
  }

  pub fn contains(&self, unit: &U) -> bool {
    self.index.contains(unit)
  }

  /// Returns `false` if the unit was already a member.
  fn insert(&mut self, unit: U) -> bool {
    if !self.index.insert(unit.clone()) {
      return false;
    }
    self.members.push(unit);
    true
  }

  /// Returns `false` if the unit was not a member.
  fn remove(&mut self, unit: &U) -> bool {
    if !self.index.remove(unit) {
      return false;
    }
    if let Some(pos) = self.members.iter().position(|m| m == unit) {
      self.members.remove(pos);
    }
    true
  }
}

// =============================================================================
// DeferredMutation
// =============================================================================

/// Membership change submitted while a conversion was in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredMutation<U> {
  Add(U),
  Remove(U),
}

// =============================================================================
// Registry
// =============================================================================

/// Ordered groups plus a key lookup.
#[derive(Debug, Clone)]
pub struct Registry<U> {
  groups: Vec<Group<U>>,
  lookup: HashMap<GroupKey, usize>,
}

impl<U: ConvertibleUnit> Default for Registry<U> {
  fn default() -> Self {
    Self::new()
  }
}

impl<U: ConvertibleUnit> Registry<U> {
  /// Create an empty registry.
  pub fn new() -> Self {
    Self {
      groups: Vec::new(),
      lookup: HashMap::new(),
    }
  }

  /// Build a registry from configured groups, in configuration order.
  pub fn from_config(groups: &[GroupConfig]) -> Result<Self, RegistryError> {
    let mut registry = Self::new();
    for group in groups {
      registry.register_group(group.key.clone(), group.batch_planar, group.batch_spatial)?;
    }
    Ok(registry)
  }

  /// Append a group. Returns its order index.
  pub fn register_group(
    &mut self,
    key: GroupKey,
    batch_planar: usize,
    batch_spatial: usize,
  ) -> Result<usize, RegistryError> {
    if self.lookup.contains_key(&key) {
      return Err(RegistryError::DuplicateGroup(key));
    }
    let order = self.groups.len();
    self.lookup.insert(key.clone(), order);
    self
      .groups
      .push(Group::new(key, order, batch_planar, batch_spatial));
    Ok(order)
  }

  /// Groups in conversion order.
  pub fn groups(&self) -> &[Group<U>] {
    &self.groups
  }

  pub fn group(&self, key: &GroupKey) -> Option<&Group<U>> {
    self.lookup.get(key).map(|&idx| &self.groups[idx])
  }

  pub fn group_count(&self) -> usize {
    self.groups.len()
  }

  /// Total members across all groups.
  pub fn unit_count(&self) -> usize {
    self.groups.iter().map(Group::len).sum()
  }

  /// Group index for a unit's kind.
  pub fn resolve(&self, unit: &U) -> Result<usize, RegistryError> {
    self
      .lookup
      .get(unit.group_key())
      .copied()
      .ok_or_else(|| RegistryError::UnknownGroup(unit.group_key().clone()))
  }

  pub fn contains(&self, unit: &U) -> bool {
    self
      .resolve(unit)
      .is_ok_and(|idx| self.groups[idx].contains(unit))
  }

  /// Add a unit to its group. `Ok(false)` if it was already a member.
  pub fn insert(&mut self, unit: U) -> Result<bool, RegistryError> {
    let idx = self.resolve(&unit)?;
    Ok(self.groups[idx].insert(unit))
  }

  /// Remove a unit from its group. `Ok(false)` if it was not a member.
  pub fn remove(&mut self, unit: &U) -> Result<bool, RegistryError> {
    let idx = self.resolve(unit)?;
    Ok(self.groups[idx].remove(unit))
  }

  /// Apply a queued mutation.
  pub fn apply(&mut self, mutation: DeferredMutation<U>) -> Result<bool, RegistryError> {
    match mutation {
      DeferredMutation::Add(unit) => self.insert(unit),
      DeferredMutation::Remove(unit) => self.remove(&unit),
    }
  }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;
