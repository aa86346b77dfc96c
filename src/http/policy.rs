//! Request policies governing timeout, retry count, and backoff pacing.

// std
use std::fmt::{Debug, Formatter, Result as FmtResult};
// self
use crate::_prelude::*;

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default base delay used for backoff pacing.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Predicate deciding whether a classified failure warrants another attempt.
pub type RetryPredicate = Arc<dyn Fn(&crate::NormalizedError) -> bool + Send + Sync>;

/// Retry configuration for one logical HTTP call.
#[derive(Clone)]
pub struct RequestPolicy {
	/// Timeout applied to each individual attempt.
	pub timeout: Duration,
	/// Maximum number of retries after the initial attempt; total attempts is
	/// `max_retries + 1`.
	pub max_retries: u32,
	/// Base delay for backoff between attempts.
	pub retry_delay: Duration,
	/// Predicate consulted after each classified failure.
	pub retry_on: RetryPredicate,
}
impl RequestPolicy {
	/// Validate invariants for retry configuration.
	pub fn validate(&self) -> Result<()> {
		if self.timeout.is_zero() {
			return Err(Error::Validation {
				field: "policy.timeout",
				reason: "Must be greater than zero.".into(),
			});
		}

		Ok(())
	}

	/// Produce the effective policy for a call by layering overrides on top of
	/// these defaults.
	pub fn merged(&self, overrides: Option<&PolicyOverrides>) -> Self {
		let Some(overrides) = overrides else { return self.clone() };

		Self {
			timeout: overrides.timeout.unwrap_or(self.timeout),
			max_retries: overrides.max_retries.unwrap_or(self.max_retries),
			retry_delay: overrides.retry_delay.unwrap_or(self.retry_delay),
			retry_on: overrides.retry_on.clone().unwrap_or_else(|| self.retry_on.clone()),
		}
	}
}
impl Default for RequestPolicy {
	fn default() -> Self {
		Self {
			timeout: DEFAULT_TIMEOUT,
			max_retries: DEFAULT_MAX_RETRIES,
			retry_delay: DEFAULT_RETRY_DELAY,
			retry_on: Arc::new(default_retry_on),
		}
	}
}
impl Debug for RequestPolicy {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("RequestPolicy")
			.field("timeout", &self.timeout)
			.field("max_retries", &self.max_retries)
			.field("retry_delay", &self.retry_delay)
			.finish_non_exhaustive()
	}
}

/// Per-call overrides layered over an [`ApiClient`](crate::ApiClient)'s
/// default policy; unset fields fall back to the defaults.
#[derive(Clone, Default)]
pub struct PolicyOverrides {
	/// Override for the per-attempt timeout.
	pub timeout: Option<Duration>,
	/// Override for the retry count.
	pub max_retries: Option<u32>,
	/// Override for the base backoff delay.
	pub retry_delay: Option<Duration>,
	/// Override for the retry predicate.
	pub retry_on: Option<RetryPredicate>,
	/// Override for the base URL relative paths are joined onto.
	pub base_url: Option<Url>,
}
impl Debug for PolicyOverrides {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("PolicyOverrides")
			.field("timeout", &self.timeout)
			.field("max_retries", &self.max_retries)
			.field("retry_delay", &self.retry_delay)
			.field("base_url", &self.base_url)
			.finish_non_exhaustive()
	}
}

/// Default retry classification: retryable iff no status is present (pure
/// network or timeout failure) or the status is a server error. 4xx responses
/// are never retried by default.
pub fn default_retry_on(error: &crate::NormalizedError) -> bool {
	error.status.map(|status| status.is_server_error()).unwrap_or(true)
}

#[cfg(test)]
mod tests {
	// crates.io
	use reqwest::StatusCode;
	// self
	use super::*;
	use crate::NormalizedError;

	fn error_with_status(status: Option<StatusCode>) -> NormalizedError {
		NormalizedError { message: "failure".into(), status, code: None, details: None }
	}

	#[test]
	fn default_predicate_retries_network_and_server_errors_only() {
		assert!(default_retry_on(&error_with_status(None)));
		assert!(default_retry_on(&error_with_status(Some(StatusCode::INTERNAL_SERVER_ERROR))));
		assert!(default_retry_on(&error_with_status(Some(StatusCode::SERVICE_UNAVAILABLE))));
		assert!(!default_retry_on(&error_with_status(Some(StatusCode::NOT_FOUND))));
		assert!(!default_retry_on(&error_with_status(Some(StatusCode::TOO_MANY_REQUESTS))));
	}

	#[test]
	fn merged_overrides_take_precedence_field_by_field() {
		let defaults = RequestPolicy::default();
		let overrides = PolicyOverrides {
			timeout: Some(Duration::from_millis(250)),
			max_retries: Some(7),
			..Default::default()
		};
		let merged = defaults.merged(Some(&overrides));

		assert_eq!(merged.timeout, Duration::from_millis(250));
		assert_eq!(merged.max_retries, 7);
		assert_eq!(merged.retry_delay, DEFAULT_RETRY_DELAY);
	}

	#[test]
	fn zero_timeout_fails_validation() {
		let policy = RequestPolicy { timeout: Duration::ZERO, ..Default::default() };

		assert!(matches!(
			policy.validate(),
			Err(Error::Validation { field: "policy.timeout", .. })
		));
	}
}
