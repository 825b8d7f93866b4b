//! Messages in and out of the dimension shift systems.

use bevy::prelude::*;
use dimension_plugin::{ConversionReport, Direction};

/// Ask for a conversion. Rejected requests are logged and dropped.
#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirectionRequest {
  To(Direction),
  /// Opposite of the committed direction.
  Toggle,
}

/// A request was accepted and units started converting.
#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConversionStarted {
  pub direction: Direction,
}

/// The deadline elapsed and the direction is committed.
#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConversionFinished {
  pub direction: Direction,
  pub report: Option<ConversionReport>,
}
