//! Injectable time source so staleness is deterministic under test.

// std
use std::{
	fmt::Debug,
	sync::{Mutex, PoisonError},
};
// self
use crate::_prelude::*;

/// Source of wall-clock time consulted by the cache.
pub trait Clock: Debug + Send + Sync {
	/// Current wall-clock time.
	fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

/// Manually advanced clock for driving staleness in tests.
#[derive(Debug)]
pub struct ManualClock {
	now: Mutex<DateTime<Utc>>,
}
impl ManualClock {
	/// Create a clock pinned to the given instant.
	pub fn new(now: DateTime<Utc>) -> Self {
		Self { now: Mutex::new(now) }
	}

	/// Create a clock pinned to the current system time.
	pub fn starting_now() -> Self {
		Self::new(Utc::now())
	}

	/// Advance the clock by the given delta.
	pub fn advance(&self, delta: TimeDelta) {
		let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);

		*now += delta;
	}
}
impl Clock for ManualClock {
	fn now(&self) -> DateTime<Utc> {
		*self.now.lock().unwrap_or_else(PoisonError::into_inner)
	}
}
