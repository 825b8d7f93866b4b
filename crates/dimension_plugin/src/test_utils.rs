//! Shared fixtures for coordinator tests.

use std::cell::RefCell;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::types::{Direction, GroupKey};
use crate::unit::{ConvertibleUnit, SelfConverting, UnitError};

/// Ordered record of every conversion call, shared by all units of a test.
#[derive(Clone, Debug, Default)]
pub struct ConversionLog(Rc<RefCell<Vec<(u32, Direction)>>>);

impl ConversionLog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&self, id: u32, direction: Direction) {
    self.0.borrow_mut().push((id, direction));
  }

  pub fn len(&self) -> usize {
    self.0.borrow().len()
  }

  /// Ids in conversion order.
  pub fn ids(&self) -> Vec<u32> {
    self.0.borrow().iter().map(|(id, _)| *id).collect()
  }

  /// Number of calls a unit received for a direction.
  pub fn count(&self, id: u32, direction: Direction) -> usize {
    self
      .0
      .borrow()
      .iter()
      .filter(|(i, d)| *i == id && *d == direction)
      .count()
  }
}

/// Unit whose identity is its id. Conversions append to a shared log.
#[derive(Clone, Debug)]
pub struct TestUnit {
  pub id: u32,
  key: GroupKey,
  log: ConversionLog,
  fail: bool,
}

impl TestUnit {
  pub fn new(id: u32, key: &str, log: &ConversionLog) -> Self {
    Self {
      id,
      key: GroupKey::from(key),
      log: log.clone(),
      fail: false,
    }
  }

  /// Unit whose conversion always errors (after logging the call).
  pub fn failing(id: u32, key: &str, log: &ConversionLog) -> Self {
    Self {
      fail: true,
      ..Self::new(id, key, log)
    }
  }

  fn record(&self, direction: Direction) -> Result<(), UnitError> {
    self.log.push(self.id, direction);
    if self.fail {
      return Err(UnitError::new(format!("unit {} refused to convert", self.id)));
    }
    Ok(())
  }
}

impl PartialEq for TestUnit {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for TestUnit {}

impl Hash for TestUnit {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.id.hash(state);
  }
}

impl ConvertibleUnit for TestUnit {
  fn group_key(&self) -> &GroupKey {
    &self.key
  }
}

impl SelfConverting for TestUnit {
  fn convert_to_planar(&self) -> Result<(), UnitError> {
    self.record(Direction::Planar)
  }

  fn convert_to_spatial(&self) -> Result<(), UnitError> {
    self.record(Direction::Spatial)
  }
}

/// `count` units of one kind with consecutive ids starting at `first_id`.
pub fn make_units(first_id: u32, count: u32, key: &str, log: &ConversionLog) -> Vec<TestUnit> {
  (first_id..first_id + count)
    .map(|id| TestUnit::new(id, key, log))
    .collect()
}
