//! App-level tests for the dimension shift plugin.
//!
//! Runs the plugin under `MinimalPlugins` with a manual frame loop. Deadlines
//! are either zero or far beyond anything the test frames add up to, so real
//! frame time never affects the outcome. Tests that need the deadline to
//! elapse mid-conversion step time manually.

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use dimension_plugin::{ConverterConfig, Direction, GroupConfig};

use crate::systems;
use crate::{
  ConversionFinished, ConversionStarted, Convertible, DimensionCoordinator, DimensionShiftPlugin,
  DirectionRequest, Representation, UnitIndex,
};

const FAR: f32 = 3600.0;

// =============================================================================
// Helpers
// =============================================================================

#[derive(Resource, Default)]
struct MessageCounts {
  started: usize,
  finished: Vec<Direction>,
}

fn count_messages(
  mut started: MessageReader<ConversionStarted>,
  mut finished: MessageReader<ConversionFinished>,
  mut counts: ResMut<MessageCounts>,
) {
  counts.started += started.read().count();
  counts.finished.extend(finished.read().map(|m| m.direction));
}

fn config(conversion_time: f32, batch: usize) -> ConverterConfig {
  ConverterConfig {
    conversion_time,
    ..ConverterConfig::with_groups(vec![
      GroupConfig::new("collider", batch, batch),
      GroupConfig::new("sprite", batch, batch),
    ])
  }
}

fn app_with(config: &ConverterConfig, pause_virtual_time: bool) -> App {
  let mut app = App::new();
  app.add_plugins(MinimalPlugins);
  app.add_plugins(
    DimensionShiftPlugin::new(config)
      .unwrap()
      .with_paused_virtual_time(pause_virtual_time),
  );
  app.init_resource::<MessageCounts>();
  app.add_systems(Update, count_messages.after(systems::handle_direction_requests));
  app
}

fn spawn_units(app: &mut App, key: &str, count: usize) -> Vec<Entity> {
  (0..count)
    .map(|_| app.world_mut().spawn(Convertible::new(key)).id())
    .collect()
}

fn representation(app: &App, entity: Entity) -> Option<Direction> {
  app.world().get::<Representation>(entity).map(|r| r.0)
}

fn coordinator(app: &App) -> &DimensionCoordinator {
  app.world().resource::<DimensionCoordinator>()
}

// =============================================================================
// Registration
// =============================================================================

#[test]
fn test_spawned_units_are_registered() {
  let mut app = app_with(&config(0.0, 16), false);
  spawn_units(&mut app, "collider", 3);
  spawn_units(&mut app, "sprite", 2);
  app.update();

  assert_eq!(coordinator(&app).registry().unit_count(), 5);
  assert_eq!(app.world().resource::<UnitIndex>().len(), 5);
}

#[test]
fn test_unknown_kind_is_not_registered() {
  let mut app = app_with(&config(0.0, 16), false);
  let stray = spawn_units(&mut app, "audio", 1)[0];
  app.update();

  assert_eq!(coordinator(&app).registry().unit_count(), 0);
  assert!(!app.world().resource::<UnitIndex>().contains(stray));
}

#[test]
fn test_despawned_units_are_unregistered() {
  let mut app = app_with(&config(0.0, 16), false);
  let units = spawn_units(&mut app, "collider", 3);
  app.update();

  app.world_mut().despawn(units[1]);
  app.update();

  assert_eq!(coordinator(&app).registry().unit_count(), 2);
  assert!(!app.world().resource::<UnitIndex>().contains(units[1]));
}

// =============================================================================
// Conversion
// =============================================================================

#[test]
fn test_toggle_converts_every_unit_and_commits() {
  let mut app = app_with(&config(0.0, 16), false);
  let units = spawn_units(&mut app, "collider", 4);
  app.update();

  app.world_mut().write_message(DirectionRequest::Toggle);
  app.update();

  // Everything converts in the request frame; the deadline is first checked
  // on the next one.
  for entity in &units {
    assert_eq!(representation(&app, *entity), Some(Direction::Spatial));
  }
  assert!(coordinator(&app).is_converting());

  app.update();
  assert!(!coordinator(&app).is_converting());
  assert_eq!(coordinator(&app).current_direction(), Direction::Spatial);

  let counts = app.world().resource::<MessageCounts>();
  assert_eq!(counts.started, 1);
  assert_eq!(counts.finished, vec![Direction::Spatial]);
}

#[test]
fn test_batched_drain_spreads_over_frames() {
  let mut app = app_with(&config(FAR, 1), false);
  let units = spawn_units(&mut app, "collider", 3);
  app.update();

  app.world_mut().write_message(DirectionRequest::To(Direction::Spatial));
  app.update();

  // One unit per frame, starting with the request frame.
  let converted = |app: &App| {
    units
      .iter()
      .filter(|e| representation(app, **e) == Some(Direction::Spatial))
      .count()
  };
  assert_eq!(converted(&app), 1);
  assert!(coordinator(&app).is_converting());

  app.update();
  assert_eq!(converted(&app), 2);

  app.update();
  assert_eq!(converted(&app), 3);
  assert!(coordinator(&app).is_converting());
  assert_eq!(coordinator(&app).current_direction(), Direction::Planar);
  assert!(app.world().resource::<MessageCounts>().finished.is_empty());
}

#[test]
fn test_request_while_converting_is_dropped() {
  let mut app = app_with(&config(FAR, 1), false);
  spawn_units(&mut app, "collider", 2);
  app.update();

  app.world_mut().write_message(DirectionRequest::Toggle);
  app.update();
  app.world_mut().write_message(DirectionRequest::To(Direction::Planar));
  app.update();

  assert_eq!(app.world().resource::<MessageCounts>().started, 1);
  assert_eq!(coordinator(&app).target_direction(), Some(Direction::Spatial));
}

#[test]
fn test_request_for_committed_direction_is_dropped() {
  let mut app = app_with(&config(0.0, 16), false);
  spawn_units(&mut app, "collider", 2);
  app.update();

  app.world_mut().write_message(DirectionRequest::To(Direction::Planar));
  app.update();

  assert_eq!(app.world().resource::<MessageCounts>().started, 0);
  assert!(!coordinator(&app).is_converting());
}

#[test]
fn test_unit_spawned_mid_conversion_joins_after_commit() {
  let mut app = app_with(&config(0.25, 1), false);
  app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(100)));
  let units = spawn_units(&mut app, "collider", 2);
  app.update();

  app.world_mut().write_message(DirectionRequest::Toggle);
  app.update();

  let late = spawn_units(&mut app, "sprite", 1)[0];
  app.update();
  assert_eq!(coordinator(&app).registry().unit_count(), 2);
  assert_eq!(coordinator(&app).pending_mutations(), 1);

  for _ in 0..10 {
    if !coordinator(&app).is_converting() {
      break;
    }
    app.update();
  }

  assert!(!coordinator(&app).is_converting());
  assert_eq!(coordinator(&app).registry().unit_count(), 3);
  assert_eq!(coordinator(&app).pending_mutations(), 0);
  assert_eq!(representation(&app, late), None);
  for entity in &units {
    assert_eq!(representation(&app, *entity), Some(Direction::Spatial));
  }
  assert_eq!(
    app.world().resource::<MessageCounts>().finished,
    vec![Direction::Spatial]
  );
}

#[test]
fn test_finished_message_carries_report() {
  let mut app = app_with(&config(0.0, 16), false);
  spawn_units(&mut app, "collider", 2);
  spawn_units(&mut app, "sprite", 3);
  app.update();

  app.world_mut().write_message(DirectionRequest::Toggle);
  app.update();
  app.update();

  let report = coordinator(&app).last_report().copied().unwrap();
  assert_eq!(report.direction, Direction::Spatial);
  assert_eq!(report.stats.units_converted, 5);
  assert_eq!(report.stats.failures, 0);
}

// =============================================================================
// Virtual time
// =============================================================================

#[test]
fn test_virtual_time_paused_while_converting() {
  let mut app = app_with(&config(FAR, 1), true);
  spawn_units(&mut app, "collider", 3);
  app.update();

  app.world_mut().write_message(DirectionRequest::Toggle);
  app.update();

  assert!(app.world().resource::<Time<Virtual>>().is_paused());
}

#[test]
fn test_virtual_time_resumes_after_commit() {
  let mut app = app_with(&config(0.0, 16), true);
  spawn_units(&mut app, "collider", 3);
  app.update();

  app.world_mut().write_message(DirectionRequest::Toggle);
  app.update();
  assert!(app.world().resource::<Time<Virtual>>().is_paused());

  app.update();
  assert!(!app.world().resource::<Time<Virtual>>().is_paused());
  assert_eq!(app.world().resource::<MessageCounts>().finished.len(), 1);
}

#[test]
fn test_virtual_time_paused_before_conversion_stays_paused() {
  let mut app = app_with(&config(0.0, 16), true);
  spawn_units(&mut app, "collider", 3);
  app.update();
  app.world_mut().resource_mut::<Time<Virtual>>().pause();

  app.world_mut().write_message(DirectionRequest::Toggle);
  app.update();
  app.update();

  assert_eq!(app.world().resource::<MessageCounts>().finished.len(), 1);
  assert!(app.world().resource::<Time<Virtual>>().is_paused());
}

#[test]
fn test_virtual_time_untouched_when_disabled() {
  let mut app = app_with(&config(FAR, 1), false);
  spawn_units(&mut app, "collider", 3);
  app.update();

  app.world_mut().write_message(DirectionRequest::Toggle);
  app.update();

  assert!(!app.world().resource::<Time<Virtual>>().is_paused());
}
