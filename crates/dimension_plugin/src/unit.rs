//! Unit capability contract.
//!
//! A unit is a cheap, caller-owned handle (an `Rc`, an entity id, an index)
//! whose identity is its `Eq`/`Hash`. The coordinator never inspects a unit
//! beyond its group key and the conversion calls.

use std::fmt::Debug;
use std::hash::Hash;

use thiserror::Error;

use crate::types::{Direction, GroupKey};

/// Handle to a caller-owned object that can be flipped between
/// representations.
pub trait ConvertibleUnit: Clone + Eq + Hash + Debug {
  /// Kind of this unit. Must not change while the unit is registered.
  fn group_key(&self) -> &GroupKey;
}

/// Units that carry their own conversion routines.
///
/// Coordinators over such units can be driven with the plain
/// [`request_direction`](crate::ConversionCoordinator::request_direction) and
/// [`tick`](crate::ConversionCoordinator::tick) calls. Units whose conversion
/// needs outside context (an ECS command buffer, a renderer) use the `*_with`
/// variants and pass an applicator instead.
pub trait SelfConverting: ConvertibleUnit {
  fn convert_to_planar(&self) -> Result<(), UnitError>;

  fn convert_to_spatial(&self) -> Result<(), UnitError>;

  fn convert_to(&self, direction: Direction) -> Result<(), UnitError> {
    match direction {
      Direction::Planar => self.convert_to_planar(),
      Direction::Spatial => self.convert_to_spatial(),
    }
  }
}

/// Failure reported by a unit's conversion routine.
///
/// The drain logs these and moves on to the next unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct UnitError(pub String);

impl UnitError {
  pub fn new(message: impl Into<String>) -> Self {
    Self(message.into())
  }
}
