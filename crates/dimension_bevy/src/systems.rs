//! Systems driving the coordinator from the Bevy schedule.

use bevy::prelude::*;
use dimension_plugin::{Direction, UnitError};

use crate::components::{Convertible, EntityUnit, Representation};
use crate::messages::{ConversionFinished, ConversionStarted, DirectionRequest};
use crate::resources::{DimensionCoordinator, DimensionSettings, UnitIndex, VirtualTimeRestore};

/// Queue a `Representation` write for a unit. Despawned entities count as
/// failed conversions.
fn present(commands: &mut Commands, unit: &EntityUnit, direction: Direction) -> Result<(), UnitError> {
  match commands.get_entity(unit.entity) {
    Ok(mut entity_commands) => {
      entity_commands.try_insert(Representation(direction));
      Ok(())
    }
    Err(_) => Err(UnitError::new(format!("entity {:?} no longer exists", unit.entity))),
  }
}

// =============================================================================
// Membership
// =============================================================================

/// Register newly added `Convertible` entities.
pub fn register_units(
  added: Query<(Entity, &Convertible), Added<Convertible>>,
  mut coordinator: ResMut<DimensionCoordinator>,
  mut index: ResMut<UnitIndex>,
) {
  for (entity, convertible) in &added {
    let unit = EntityUnit::new(entity, convertible.key.clone());
    match coordinator.add(unit) {
      Ok(_) => index.insert(entity, convertible.key.clone()),
      Err(err) => error!("{:?} not registered: {}", entity, err),
    }
  }
}

/// Unregister entities that lost `Convertible` or were despawned.
pub fn unregister_units(
  mut removed: RemovedComponents<Convertible>,
  mut coordinator: ResMut<DimensionCoordinator>,
  mut index: ResMut<UnitIndex>,
) {
  for entity in removed.read() {
    let Some(key) = index.remove(entity) else {
      continue;
    };
    if let Err(err) = coordinator.remove(EntityUnit::new(entity, key)) {
      error!("{:?} not unregistered: {}", entity, err);
    }
  }
}

// =============================================================================
// Conversion
// =============================================================================

/// Start conversions for incoming requests.
///
/// The first slice of units is converted right here; the drain resumes in
/// `drive_conversion` on the next frame. Rejections were already logged by
/// the coordinator.
pub fn handle_direction_requests(
  mut requests: MessageReader<DirectionRequest>,
  mut coordinator: ResMut<DimensionCoordinator>,
  mut commands: Commands,
  mut started: MessageWriter<ConversionStarted>,
  settings: Res<DimensionSettings>,
  mut restore: ResMut<VirtualTimeRestore>,
  virtual_time: Option<ResMut<Time<Virtual>>>,
) {
  let mut accepted = None;
  for request in requests.read() {
    let mut apply = |unit: &EntityUnit, direction: Direction| present(&mut commands, unit, direction);
    let result = match *request {
      DirectionRequest::To(direction) => coordinator
        .request_direction_with(direction, &mut apply)
        .map(|()| direction),
      DirectionRequest::Toggle => coordinator.toggle_with(&mut apply),
    };
    if let Ok(direction) = result {
      started.write(ConversionStarted { direction });
      accepted = Some(direction);
    }
  }

  if accepted.is_some() && settings.pause_virtual_time {
    if let Some(mut virtual_time) = virtual_time {
      restore.was_paused = Some(virtual_time.is_paused());
      virtual_time.pause();
    }
  }
}

/// Advance the deadline and the drain by one frame of real time.
///
/// Runs before `handle_direction_requests`, so a conversion accepted this
/// frame is first ticked on the next one.
pub fn drive_conversion(
  time: Res<Time<Real>>,
  mut coordinator: ResMut<DimensionCoordinator>,
  mut commands: Commands,
  mut finished: MessageWriter<ConversionFinished>,
  mut restore: ResMut<VirtualTimeRestore>,
  virtual_time: Option<ResMut<Time<Virtual>>>,
) {
  if !coordinator.is_converting() && !coordinator.is_draining() {
    return;
  }

  let outcome = coordinator.tick_with(time.delta(), |unit: &EntityUnit, direction: Direction| {
    present(&mut commands, unit, direction)
  });

  let Some(direction) = outcome.committed else {
    return;
  };
  finished.write(ConversionFinished {
    direction,
    report: coordinator.last_report().copied(),
  });
  let Some(was_paused) = restore.was_paused.take() else {
    return;
  };
  if let Some(mut virtual_time) = virtual_time {
    if !was_paused {
      virtual_time.unpause();
    }
  }
}
