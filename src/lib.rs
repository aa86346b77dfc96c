//! Async identity cache and retry-governed HTTP executor for externally embedded
//! chart resources — keeps distributed embed links alive across permalink rotation.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod cache;
pub mod http;
pub mod metrics;
pub mod parse;

mod error;
mod _prelude {
	pub use std::{sync::Arc, time::Duration};

	pub use chrono::{DateTime, TimeDelta, Utc};
	pub use url::Url;

	pub use crate::{Error, Result};
}
#[cfg(test)]
mod _test {
	use tracing_subscriber as _;
	use wiremock as _;
}

pub use crate::{
	cache::{
		clock::{Clock, ManualClock, SystemClock},
		entry::ChartUrlEntry,
		links::{ChartLinkCache, ChartLinkCacheBuilder, ProbeOutcome},
	},
	error::{Error, NormalizedError, Result},
	http::{
		client::{ApiClient, ApiClientBuilder, ApiResponse},
		policy::{PolicyOverrides, RequestPolicy, RetryPredicate},
	},
};
