//! ConversionCoordinator - the conversion controller.
//!
//! Owns the registry, the committed direction, the deadline timer and the
//! in-flight drain. Driven by an external tick source:
//!
//! ```text
//! request_direction(d)            tick(delta) (once per frame)
//! ┌──────────────────────┐        ┌──────────────────────────────────┐
//! │ gate: Idle, d != cur │        │ 1. advance deadline              │
//! │ fire before hooks    │        │    elapsed -> Idle, commit d,    │
//! │ state = Converting   │        │    after hooks                   │
//! │ start deadline       │        │ 2. resume drain                  │
//! │ drain first slice    │        │    (no yields once Idle)         │
//! └──────────────────────┘        │ 3. drain done -> apply deferred  │
//!                                 └──────────────────────────────────┘
//! ```
//!
//! The deadline and the drain are not joined. The deadline only flips the
//! state the drain reads; the after hooks may fire while units are still
//! queued, and that remaining work finishes in the same tick.

use std::mem;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};
use web_time::Instant;

use crate::config::{ConfigError, ConversionSettings, ConverterConfig};
use crate::deadline::DeadlineTimer;
use crate::drain::{BatchDrain, DrainProgress};
use crate::hooks::{ConversionHooks, SubscriptionId};
use crate::registry::{DeferredMutation, Registry, RegistryError};
use crate::stats::{ConversionReport, ConversionStats};
use crate::types::{ConversionState, Direction};
use crate::unit::{ConvertibleUnit, SelfConverting, UnitError};

/// Why a direction request was turned down. Non-fatal; nothing changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RequestRejected {
  #[error("a conversion to {0} is already in progress")]
  AlreadyConverting(Direction),
  #[error("already committed to {0}")]
  AlreadyCommitted(Direction),
}

/// Errors building a coordinator from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
  #[error(transparent)]
  Config(#[from] ConfigError),
  #[error(transparent)]
  Registry(#[from] RegistryError),
}

/// What an `add`/`remove` call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationOutcome {
  /// Membership changed.
  Applied,
  /// Already a member (add) or not a member (remove).
  Unchanged,
  /// Queued until the in-flight conversion commits.
  Deferred,
}

/// What happened during one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
  /// Direction committed this tick, if the deadline elapsed.
  pub committed: Option<Direction>,
  /// Conversion calls made this tick.
  pub converted: usize,
  /// The drain still has work after this tick.
  pub drain_pending: bool,
}

/// Coordinates flipping every registered unit between representations.
#[derive(Debug)]
pub struct ConversionCoordinator<U: ConvertibleUnit> {
  settings: ConversionSettings,
  registry: Registry<U>,
  state: ConversionState,
  committed: Direction,
  /// Direction being converted toward while `Converting`.
  target: Option<Direction>,
  deadline: Option<DeadlineTimer>,
  drain: Option<BatchDrain<U>>,
  deferred: Vec<DeferredMutation<U>>,
  hooks: ConversionHooks,
  /// Stats of the conversion whose drain or deadline is still running.
  in_flight: Option<ConversionStats>,
  last_report: Option<ConversionReport>,
}

impl<U: ConvertibleUnit> ConversionCoordinator<U> {
  /// Create a coordinator over an already-built registry.
  pub fn new(settings: ConversionSettings, registry: Registry<U>) -> Self {
    Self {
      settings,
      registry,
      state: ConversionState::Idle,
      committed: settings.initial_direction,
      target: None,
      deadline: None,
      drain: None,
      deferred: Vec::new(),
      hooks: ConversionHooks::new(),
      in_flight: None,
      last_report: None,
    }
  }

  /// Validate configuration and build the registry from it.
  pub fn from_config(config: &ConverterConfig) -> Result<Self, SetupError> {
    config.validate()?;
    let settings = config.settings()?;
    let registry = Registry::from_config(&config.groups)?;
    info!(
      groups = registry.group_count(),
      conversion_time = ?settings.conversion_time,
      batched = settings.batched,
      "conversion coordinator ready"
    );
    Ok(Self::new(settings, registry))
  }

  // ===========================================================================
  // Queries
  // ===========================================================================

  #[inline]
  pub fn is_converting(&self) -> bool {
    self.state == ConversionState::Converting
  }

  pub fn state(&self) -> ConversionState {
    self.state
  }

  /// Last committed direction. Does not change until the deadline elapses.
  pub fn current_direction(&self) -> Direction {
    self.committed
  }

  /// Direction being converted toward, while converting.
  pub fn target_direction(&self) -> Option<Direction> {
    self.target
  }

  pub fn settings(&self) -> &ConversionSettings {
    &self.settings
  }

  pub fn registry(&self) -> &Registry<U> {
    &self.registry
  }

  /// True while the drain still has units to visit. Can outlast
  /// `is_converting` only within a single tick.
  pub fn is_draining(&self) -> bool {
    self.drain.is_some()
  }

  /// Time left before the in-flight conversion commits.
  pub fn remaining_time(&self) -> Option<Duration> {
    self.deadline.as_ref().map(DeadlineTimer::remaining)
  }

  /// Mutations waiting for the in-flight conversion to commit.
  pub fn pending_mutations(&self) -> usize {
    self.deferred.len()
  }

  /// Counters of the in-flight conversion.
  pub fn stats(&self) -> Option<&ConversionStats> {
    self.in_flight.as_ref()
  }

  /// Counters of the most recently completed conversion.
  pub fn last_report(&self) -> Option<&ConversionReport> {
    self.last_report.as_ref()
  }

  // ===========================================================================
  // Hooks
  // ===========================================================================

  /// Shared hook handle, for handlers that need to (un)subscribe themselves.
  pub fn hooks(&self) -> ConversionHooks {
    self.hooks.clone()
  }

  pub fn subscribe_before<F>(&self, handler: F) -> SubscriptionId
  where
    F: FnMut(Direction) + Send + 'static,
  {
    self.hooks.subscribe_before(handler)
  }

  pub fn subscribe_after<F>(&self, handler: F) -> SubscriptionId
  where
    F: FnMut(Direction) + Send + 'static,
  {
    self.hooks.subscribe_after(handler)
  }

  pub fn unsubscribe_before(&self, id: SubscriptionId) -> bool {
    self.hooks.unsubscribe_before(id)
  }

  pub fn unsubscribe_after(&self, id: SubscriptionId) -> bool {
    self.hooks.unsubscribe_after(id)
  }

  // ===========================================================================
  // Membership
  // ===========================================================================

  /// Register a unit with its group.
  ///
  /// An unregistered kind is a setup mistake and is returned as an error
  /// (and logged). While converting, the add is queued until the commit and
  /// the drain have both finished.
  pub fn add(&mut self, unit: U) -> Result<MutationOutcome, RegistryError> {
    self.submit(DeferredMutation::Add(unit))
  }

  /// Unregister a unit. Removing a non-member is a no-op.
  pub fn remove(&mut self, unit: U) -> Result<MutationOutcome, RegistryError> {
    self.submit(DeferredMutation::Remove(unit))
  }

  fn submit(&mut self, mutation: DeferredMutation<U>) -> Result<MutationOutcome, RegistryError> {
    let unit = match &mutation {
      DeferredMutation::Add(unit) | DeferredMutation::Remove(unit) => unit,
    };
    if let Err(err) = self.registry.resolve(unit) {
      error!(unit = ?unit, error = %err, "unit kind not registered");
      return Err(err);
    }

    if self.is_converting() || self.drain.is_some() {
      debug!(mutation = ?mutation, "conversion in flight, deferring membership change");
      self.deferred.push(mutation);
      return Ok(MutationOutcome::Deferred);
    }

    let changed = self.registry.apply(mutation)?;
    Ok(if changed {
      MutationOutcome::Applied
    } else {
      MutationOutcome::Unchanged
    })
  }

  // ===========================================================================
  // Conversion
  // ===========================================================================

  /// Start converting every unit toward `direction`, handing each unit to
  /// `apply`.
  ///
  /// The first slice of work runs before this returns (all of it when not
  /// batched). Rejected while converting or when `direction` is already
  /// committed; rejection changes nothing and fires no hooks.
  pub fn request_direction_with<F>(
    &mut self,
    direction: Direction,
    mut apply: F,
  ) -> Result<(), RequestRejected>
  where
    F: FnMut(&U, Direction) -> Result<(), UnitError>,
  {
    if let Some(target) = self.target {
      warn!(requested = %direction, %target, "conversion already in progress, request rejected");
      return Err(RequestRejected::AlreadyConverting(target));
    }
    if direction == self.committed {
      warn!(%direction, "already in requested direction, request rejected");
      return Err(RequestRejected::AlreadyCommitted(direction));
    }
    debug_assert!(self.drain.is_none(), "drain outlived its conversion");

    self.hooks.fire_before(direction);

    self.state = ConversionState::Converting;
    self.target = Some(direction);
    self.deadline = Some(DeadlineTimer::new(self.settings.conversion_time));
    self.drain = Some(BatchDrain::new(direction, self.settings.batched));
    self.in_flight = Some(ConversionStats::default());
    info!(
      from = %self.committed,
      to = %direction,
      units = self.registry.unit_count(),
      batched = self.settings.batched,
      "conversion started"
    );

    self.resume_drain(&mut apply);
    Ok(())
  }

  /// Request the opposite of the committed direction.
  pub fn toggle_with<F>(&mut self, apply: F) -> Result<Direction, RequestRejected>
  where
    F: FnMut(&U, Direction) -> Result<(), UnitError>,
  {
    let direction = self.committed.opposite();
    self.request_direction_with(direction, apply)?;
    Ok(direction)
  }

  /// Advance one scheduling step with `delta` of real time.
  ///
  /// The deadline is checked before the drain resumes, so a drain resumed in
  /// the tick its deadline elapses finishes without yielding.
  pub fn tick_with<F>(&mut self, delta: Duration, mut apply: F) -> TickOutcome
  where
    F: FnMut(&U, Direction) -> Result<(), UnitError>,
  {
    let mut outcome = TickOutcome::default();
    if let Some(stats) = self.in_flight.as_mut() {
      stats.ticks += 1;
    }

    let elapsed = self
      .deadline
      .as_mut()
      .is_some_and(|deadline| deadline.advance(delta));
    if elapsed {
      outcome.committed = self.commit();
    }

    if self.drain.is_some() {
      outcome.converted = self.resume_drain(&mut apply);
      if !self.is_converting() && self.drain.is_none() {
        self.apply_deferred();
      }
    }
    outcome.drain_pending = self.drain.is_some();

    self.finish_report();
    outcome
  }

  /// Deadline elapsed: go idle, commit, then notify. Queued membership
  /// changes are applied here unless a drain is still walking the registry.
  fn commit(&mut self) -> Option<Direction> {
    let direction = self.target.take()?;
    self.state = ConversionState::Idle;
    self.committed = direction;
    self.deadline = None;

    if self.drain.is_none() {
      self.apply_deferred();
    }

    if self.drain.is_some() && self.settings.batched {
      if let Some(stats) = self.in_flight.as_mut() {
        stats.fallback_engaged = true;
      }
    }
    info!(
      %direction,
      draining = self.drain.is_some(),
      "conversion committed"
    );

    self.hooks.fire_after(direction);
    Some(direction)
  }

  /// Apply membership changes queued during the conversion. Only called once
  /// no drain is walking the registry.
  fn apply_deferred(&mut self) {
    for mutation in mem::take(&mut self.deferred) {
      // Kinds were validated on submission.
      if let Err(err) = self.registry.apply(mutation) {
        error!(error = %err, "deferred membership change failed");
      }
    }
  }

  /// Resume the drain. Returns the number of conversion calls made.
  fn resume_drain(&mut self, apply: &mut dyn FnMut(&U, Direction) -> Result<(), UnitError>) -> usize {
    let Some(drain) = self.drain.as_mut() else {
      return 0;
    };
    let stats = self.in_flight.get_or_insert_with(ConversionStats::default);
    let attempted_before = stats.attempted();
    let converting = self.state == ConversionState::Converting;

    let start = Instant::now();
    let progress = drain.resume(self.registry.groups(), converting, apply, stats);
    stats.drain_us += start.elapsed().as_micros() as u64;
    let converted = stats.attempted() - attempted_before;

    match progress {
      DrainProgress::Suspended => {
        debug!(
          direction = %drain.direction(),
          group = drain.group_index(),
          converted,
          "drain suspended"
        );
      }
      DrainProgress::Finished => {
        debug!(direction = %drain.direction(), converted, "drain finished");
        self.drain = None;
      }
    }
    converted
  }

  /// Move in-flight stats to the report once both deadline and drain are done.
  fn finish_report(&mut self) {
    if self.is_converting() || self.drain.is_some() {
      return;
    }
    if let Some(stats) = self.in_flight.take() {
      debug!(stats = ?stats, "conversion complete");
      self.last_report = Some(ConversionReport {
        direction: self.committed,
        stats,
      });
    }
  }
}

impl<U: SelfConverting> ConversionCoordinator<U> {
  /// [`request_direction_with`](Self::request_direction_with) using the
  /// units' own conversion routines.
  pub fn request_direction(&mut self, direction: Direction) -> Result<(), RequestRejected> {
    self.request_direction_with(direction, |unit: &U, d| unit.convert_to(d))
  }

  /// Request the opposite of the committed direction.
  pub fn toggle(&mut self) -> Result<Direction, RequestRejected> {
    self.toggle_with(|unit: &U, d| unit.convert_to(d))
  }

  /// [`tick_with`](Self::tick_with) using the units' own conversion routines.
  pub fn tick(&mut self, delta: Duration) -> TickOutcome {
    self.tick_with(delta, |unit: &U, d| unit.convert_to(d))
  }
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod coordinator_test;
