//! Batch drain: walks every group in order, converting members toward one
//! direction, yielding at batch boundaries.
//!
//! Stepped as an explicit state machine. Each [`BatchDrain::resume`] call runs
//! until the next suspension point or until every group is done.
//!
//! ```text
//! for each group g (configuration order):
//!   not converting at entry  -> convert all of g, no yields
//!   converting at entry      -> if c >= b(g): yield, c = 0
//!                               for each member: convert, c += 1
//!                                 if c == b(g) and still converting: yield, c = 0
//! ```
//!
//! Once the deadline has elapsed (`converting == false`) nothing yields any
//! more: the remainder of the current group and every later group drains in
//! the same call.
//!
//! A batch size of 0 yields once on entry (`0 >= 0`) and never again inside
//! that group, since the counter only grows past 0.

use tracing::{debug, warn};

use crate::registry::Group;
use crate::stats::ConversionStats;
use crate::types::Direction;
use crate::unit::{ConvertibleUnit, UnitError};

/// Result of one resume step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainProgress {
  /// Yielded at a batch boundary; resume on the next tick.
  Suspended,
  /// Every group has been walked.
  Finished,
}

/// Snapshot of the group currently being walked.
#[derive(Debug)]
struct GroupCursor<U> {
  members: Vec<U>,
  next: usize,
  batch: usize,
}

/// In-flight drain toward one direction.
#[derive(Debug)]
pub struct BatchDrain<U> {
  direction: Direction,
  batched: bool,
  group_index: usize,
  cursor: Option<GroupCursor<U>>,
  counter: usize,
  /// The entry check for `group_index` already yielded.
  entry_yielded: bool,
  /// Last step ended in a yield; the counter resets on resume.
  suspended: bool,
}

impl<U: ConvertibleUnit> BatchDrain<U> {
  /// `batched == false` converts everything on the first resume.
  pub fn new(direction: Direction, batched: bool) -> Self {
    Self {
      direction,
      batched,
      group_index: 0,
      cursor: None,
      counter: 0,
      entry_yielded: false,
      suspended: false,
    }
  }

  pub fn direction(&self) -> Direction {
    self.direction
  }

  /// Index of the group being walked (or about to be entered).
  pub fn group_index(&self) -> usize {
    self.group_index
  }

  /// Run until the next suspension point or completion.
  ///
  /// `converting` is the coordinator's flag for this step; it only changes
  /// between steps. Group membership is snapshotted when a group is entered,
  /// so mutations applied between steps never disturb the group in progress.
  pub fn resume(
    &mut self,
    groups: &[Group<U>],
    converting: bool,
    apply: &mut dyn FnMut(&U, Direction) -> Result<(), UnitError>,
    stats: &mut ConversionStats,
  ) -> DrainProgress {
    if self.suspended {
      self.suspended = false;
      self.counter = 0;
    }
    let may_yield = self.batched && converting;

    loop {
      if self.cursor.is_none() {
        let Some(group) = groups.get(self.group_index) else {
          return DrainProgress::Finished;
        };
        let batch = group.batch_size(self.direction);

        if may_yield && !self.entry_yielded && self.counter >= batch {
          self.entry_yielded = true;
          return self.suspend(stats);
        }
        self.entry_yielded = false;

        debug!(
          group = %group.key(),
          members = group.len(),
          batch,
          synchronous = !may_yield,
          "drain entering group"
        );
        self.cursor = Some(GroupCursor {
          members: group.members().to_vec(),
          next: 0,
          batch,
        });
      }

      if let Some(cursor) = self.cursor.as_mut() {
        while cursor.next < cursor.members.len() {
          let unit = &cursor.members[cursor.next];
          cursor.next += 1;
          convert_one(unit, self.direction, apply, stats);

          if !may_yield {
            continue;
          }
          self.counter += 1;
          if self.counter == cursor.batch {
            self.suspended = true;
            stats.suspensions += 1;
            return DrainProgress::Suspended;
          }
        }
      }

      self.cursor = None;
      self.group_index += 1;
    }
  }

  fn suspend(&mut self, stats: &mut ConversionStats) -> DrainProgress {
    self.suspended = true;
    stats.suspensions += 1;
    DrainProgress::Suspended
  }
}

/// Unit failures are logged and counted; the drain carries on.
fn convert_one<U: ConvertibleUnit>(
  unit: &U,
  direction: Direction,
  apply: &mut dyn FnMut(&U, Direction) -> Result<(), UnitError>,
  stats: &mut ConversionStats,
) {
  match apply(unit, direction) {
    Ok(()) => stats.units_converted += 1,
    Err(err) => {
      stats.failures += 1;
      warn!(unit = ?unit, %direction, error = %err, "unit conversion failed");
    }
  }
}

#[cfg(test)]
#[path = "drain_test.rs"]
mod drain_test;
