//! Cache entry definitions and in-place mutation helpers.

// std
use std::collections::HashMap;
// crates.io
use serde::Serialize;
// self
use crate::{_prelude::*, parse::ParsedChartUrl};

/// Identity record for one tracked chart.
///
/// Created on the first successful parse of an input URL; mutated in place by
/// probes (timestamp and validity) and identity updates (everything except
/// [`original_url`](Self::original_url)); removed only by explicit eviction.
#[derive(Clone, Debug, Serialize)]
pub struct ChartUrlEntry {
	/// First URL ever supplied for this identifier; immutable after creation.
	pub original_url: Url,
	/// URL currently considered authoritative. Always absolute and well-formed.
	pub current_url: Url,
	/// Canonical chart identifier; the cache key.
	pub resource_id: String,
	/// Scheme + host (+ port if present) of the current URL.
	pub base_url: String,
	/// Query parameters of the current URL, last value per key.
	pub parameters: HashMap<String, String>,
	/// When this entry was last created, probed, or rotated. Never decreases.
	pub last_updated: DateTime<Utc>,
	/// Confidence flag from the most recent existence probe. Advisory only;
	/// never gates whether the URL is served.
	pub is_valid: bool,
}
impl ChartUrlEntry {
	/// Create a fresh entry from a parsed URL.
	pub fn new(parsed: ParsedChartUrl, now: DateTime<Utc>) -> Self {
		let ParsedChartUrl { url, resource_id, base_url, parameters } = parsed;

		Self {
			original_url: url.clone(),
			current_url: url,
			resource_id,
			base_url,
			parameters,
			last_updated: now,
			is_valid: true,
		}
	}

	/// Whether the entry is old enough to warrant re-validation.
	pub fn is_stale(&self, now: DateTime<Utc>, refresh_interval: Duration) -> bool {
		let interval = TimeDelta::from_std(refresh_interval).unwrap_or(TimeDelta::MAX);

		now.signed_duration_since(self.last_updated) > interval
	}

	/// Record a probe outcome: validity follows reachability, the timestamp is
	/// refreshed either way.
	pub fn mark_probed(&mut self, reachable: bool, now: DateTime<Utc>) {
		self.is_valid = reachable;
		self.touch(now);
	}

	/// Replace the entry's identity with a newly parsed URL, keeping
	/// `original_url` intact.
	pub fn apply_identity(&mut self, parsed: ParsedChartUrl, now: DateTime<Utc>) {
		let ParsedChartUrl { url, resource_id, base_url, parameters } = parsed;

		self.current_url = url;
		self.resource_id = resource_id;
		self.base_url = base_url;
		self.parameters = parameters;
		self.is_valid = true;
		self.touch(now);
	}

	// last_updated must never decrease, even under a rewound injected clock.
	fn touch(&mut self, now: DateTime<Utc>) {
		self.last_updated = self.last_updated.max(now);
	}
}
