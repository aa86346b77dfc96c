//! Per-cache telemetry bookkeeping.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::_prelude::*;

/// Thread-safe telemetry accumulator for a single cache instance.
#[derive(Debug, Default)]
pub struct CacheMetrics {
	resolves: AtomicU64,
	cache_hits: AtomicU64,
	probes: AtomicU64,
	probe_failures: AtomicU64,
	parse_failures: AtomicU64,
}
impl CacheMetrics {
	/// Create a new telemetry accumulator.
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Record a resolve call.
	pub fn record_resolve(&self) {
		self.resolves.fetch_add(1, Ordering::Relaxed);
	}

	/// Record a resolve served from the cache without probing.
	pub fn record_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	/// Record an existence probe.
	pub fn record_probe(&self) {
		self.probes.fetch_add(1, Ordering::Relaxed);
	}

	/// Record a probe that could not reach the origin.
	pub fn record_probe_failure(&self) {
		self.probe_failures.fetch_add(1, Ordering::Relaxed);
	}

	/// Record an input that did not parse to a chart identifier.
	pub fn record_parse_failure(&self) {
		self.parse_failures.fetch_add(1, Ordering::Relaxed);
	}

	/// Take a point-in-time snapshot for status reporting.
	pub fn snapshot(&self) -> CacheMetricsSnapshot {
		CacheMetricsSnapshot {
			resolves: self.resolves.load(Ordering::Relaxed),
			cache_hits: self.cache_hits.load(Ordering::Relaxed),
			probes: self.probes.load(Ordering::Relaxed),
			probe_failures: self.probe_failures.load(Ordering::Relaxed),
			parse_failures: self.parse_failures.load(Ordering::Relaxed),
		}
	}
}

/// Read-only snapshot of cache telemetry counters.
#[derive(Clone, Debug)]
pub struct CacheMetricsSnapshot {
	/// Total resolve calls observed.
	pub resolves: u64,
	/// Resolves served from the cache without probing.
	pub cache_hits: u64,
	/// Existence probes issued.
	pub probes: u64,
	/// Probes that could not reach the origin.
	pub probe_failures: u64,
	/// Inputs rejected by the parser.
	pub parse_failures: u64,
}
impl CacheMetricsSnapshot {
	/// Ratio of resolves served without probing.
	pub fn hit_rate(&self) -> f64 {
		if self.resolves == 0 { 0.0 } else { self.cache_hits as f64 / self.resolves as f64 }
	}

	/// Ratio of probes that failed to reach the origin.
	pub fn probe_failure_ratio(&self) -> f64 {
		if self.probes == 0 { 0.0 } else { self.probe_failures as f64 / self.probes as f64 }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn counters_accumulate_and_snapshot() {
		let metrics = CacheMetrics::new();

		metrics.record_resolve();
		metrics.record_resolve();
		metrics.record_hit();
		metrics.record_probe();
		metrics.record_probe_failure();
		metrics.record_parse_failure();

		let snapshot = metrics.snapshot();

		assert_eq!(snapshot.resolves, 2);
		assert_eq!(snapshot.cache_hits, 1);
		assert_eq!(snapshot.probes, 1);
		assert_eq!(snapshot.probe_failures, 1);
		assert_eq!(snapshot.parse_failures, 1);
		assert!((snapshot.hit_rate() - 0.5).abs() < f64::EPSILON);
		assert!((snapshot.probe_failure_ratio() - 1.0).abs() < f64::EPSILON);
	}

	#[test]
	fn ratios_are_zero_without_traffic() {
		let snapshot = CacheMetrics::new().snapshot();

		assert_eq!(snapshot.hit_rate(), 0.0);
		assert_eq!(snapshot.probe_failure_ratio(), 0.0);
	}
}
