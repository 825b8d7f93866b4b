//! Per-conversion statistics.

use crate::types::Direction;

/// Counters for one conversion, from request to drain completion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConversionStats {
  /// Conversion calls that succeeded.
  pub units_converted: usize,
  /// Conversion calls that returned an error.
  pub failures: usize,
  /// Times the drain yielded back to the tick source.
  pub suspensions: usize,
  /// Ticks observed while the conversion was in flight.
  pub ticks: usize,
  /// The deadline elapsed before the batched drain finished; whatever was
  /// left ran without yielding.
  pub fallback_engaged: bool,
  /// Wall time spent inside the drain, in microseconds.
  pub drain_us: u64,
}

impl ConversionStats {
  /// Every conversion call made, successful or not.
  #[inline]
  pub fn attempted(&self) -> usize {
    self.units_converted + self.failures
  }
}

/// Final statistics of a completed conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConversionReport {
  pub direction: Direction,
  pub stats: ConversionStats,
}
