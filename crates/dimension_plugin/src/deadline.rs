//! Soft deadline for an in-flight conversion.
//!
//! Advanced by the real-time delta the tick source hands the coordinator, so
//! pausing or scaling the host's game clock does not stretch a conversion.

use std::time::Duration;

/// Counts real time toward a conversion deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeadlineTimer {
	limit: Duration,
	elapsed: Duration,
}

impl DeadlineTimer {
	pub fn new(limit: Duration) -> Self {
		Self {
			limit,
			elapsed: Duration::ZERO,
		}
	}

	/// Add one tick's worth of real time. Returns `true` once the deadline has
	/// been reached. A zero limit elapses on the first advance, whatever the
	/// delta.
	#[inline]
	pub fn advance(&mut self, delta: Duration) -> bool {
		self.elapsed = self.elapsed.saturating_add(delta);
		self.is_elapsed()
	}

	#[inline]
	pub fn is_elapsed(&self) -> bool {
		self.elapsed >= self.limit
	}

	pub fn elapsed(&self) -> Duration {
		self.elapsed
	}

	pub fn remaining(&self) -> Duration {
		self.limit.saturating_sub(self.elapsed)
	}
}
