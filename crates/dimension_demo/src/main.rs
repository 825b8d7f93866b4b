//! dimension_demo - headless dimension shift driver
//!
//! Spawns convertible entities for every configured group, toggles the
//! direction on a fixed interval, and logs a report for each conversion.
//! Exits once the requested number of toggles has committed.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use clap::Parser;
use dimension_bevy::{
  ConversionFinished, ConversionStarted, Convertible, DimensionCoordinator, DimensionShiftPlugin,
  DirectionRequest,
};
use dimension_plugin::{ConverterConfig, GroupKey};

/// Headless dimension shift demo.
#[derive(Parser, Debug)]
#[command(name = "dimension_demo")]
#[command(about = "Toggles a populated world between planar and spatial representations")]
struct Args {
  /// Path to configuration TOML file.
  #[arg(short, long, default_value = "crates/dimension_demo/config/demo.toml")]
  config: PathBuf,

  /// Entities spawned per group.
  #[arg(short, long, default_value_t = 200)]
  units_per_group: usize,

  /// Number of toggles before exiting.
  #[arg(short, long, default_value_t = 4)]
  toggles: u32,

  /// Seconds between toggle requests.
  #[arg(short, long, default_value_t = 1.5)]
  interval: f32,

  /// Pause virtual time while converting.
  #[arg(long)]
  pause_time: bool,

  /// Enable debug logging for the coordinator.
  #[arg(short, long)]
  verbose: bool,
}

#[derive(Resource)]
struct DemoState {
  groups: Vec<GroupKey>,
  units_per_group: usize,
  timer: Timer,
  toggles_left: u32,
  committed: u32,
}

fn main() -> Result<()> {
  let args = Args::parse();

  let config = ConverterConfig::load(&args.config)
    .with_context(|| format!("loading {}", args.config.display()))?;
  let plugin = DimensionShiftPlugin::new(&config)
    .context("invalid dimension shift configuration")?
    .with_paused_virtual_time(args.pause_time);

  let interval = Duration::try_from_secs_f32(args.interval)
    .with_context(|| format!("invalid toggle interval {}", args.interval))?;

  let filter = if args.verbose {
    "info,dimension_plugin=debug,dimension_bevy=debug"
  } else {
    "info"
  };

  App::new()
    .add_plugins(
      MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(1.0 / 60.0))),
    )
    .add_plugins(LogPlugin {
      filter: filter.into(),
      ..default()
    })
    .add_plugins(plugin)
    .insert_resource(DemoState {
      groups: config.groups.iter().map(|g| g.key.clone()).collect(),
      units_per_group: args.units_per_group,
      timer: Timer::new(interval, TimerMode::Repeating),
      toggles_left: args.toggles,
      committed: 0,
    })
    .add_systems(Startup, spawn_units)
    .add_systems(
      Update,
      (
        request_toggle,
        log_conversions.after(dimension_bevy::systems::handle_direction_requests),
      ),
    )
    .run();

  Ok(())
}

fn spawn_units(mut commands: Commands, state: Res<DemoState>) {
  for key in &state.groups {
    for i in 0..state.units_per_group {
      commands.spawn((Name::new(format!("{key}-{i}")), Convertible::new(key.clone())));
    }
  }
  info!(
    "Spawned {} units across {} groups",
    state.groups.len() * state.units_per_group,
    state.groups.len()
  );
}

/// Toggle on each interval, or exit once every toggle has committed.
fn request_toggle(
  time: Res<Time<Real>>,
  mut state: ResMut<DemoState>,
  coordinator: Res<DimensionCoordinator>,
  mut requests: MessageWriter<DirectionRequest>,
  mut exit: MessageWriter<AppExit>,
) {
  if !state.timer.tick(time.delta()).just_finished() {
    return;
  }
  if coordinator.is_converting() {
    debug!("Still converting, skipping this interval");
    return;
  }
  if state.toggles_left == 0 {
    info!("Completed {} conversions, exiting", state.committed);
    exit.write(AppExit::Success);
    return;
  }
  state.toggles_left -= 1;
  requests.write(DirectionRequest::Toggle);
}

fn log_conversions(
  mut started: MessageReader<ConversionStarted>,
  mut finished: MessageReader<ConversionFinished>,
  mut state: ResMut<DemoState>,
) {
  for message in started.read() {
    info!("Converting to {}", message.direction);
  }
  for message in finished.read() {
    state.committed += 1;
    match message.report {
      Some(report) => info!(
        "Committed {}: {} converted, {} failed, {} suspensions over {} ticks, fallback={}, {}us draining",
        report.direction,
        report.stats.units_converted,
        report.stats.failures,
        report.stats.suspensions,
        report.stats.ticks,
        report.stats.fallback_engaged,
        report.stats.drain_us
      ),
      None => info!("Committed {}", message.direction),
    }
  }
}
