//! Retry budgeting and backoff pacing for HTTP attempts.

// crates.io
use tokio::time;
// self
use crate::{_prelude::*, http::policy::RequestPolicy};

/// Tracks attempt accounting and backoff progression for one logical call.
///
/// The delay grows linearly with the attempt index: the wait before attempt
/// `n + 1` is `retry_delay * (n + 1)`. This linear schedule is part of the
/// documented retry contract and is pinned by tests; it is not an exponential
/// schedule.
#[derive(Debug)]
pub struct RetryExecutor<'a> {
	policy: &'a RequestPolicy,
	retries_used: u32,
}
impl<'a> RetryExecutor<'a> {
	/// Create an executor respecting the supplied policy.
	pub fn new(policy: &'a RequestPolicy) -> Self {
		Self { policy, retries_used: 0 }
	}

	/// Whether another retry is permitted under the policy.
	pub fn can_retry(&self) -> bool {
		self.retries_used < self.policy.max_retries
	}

	/// Number of retries that have already been consumed.
	pub fn retries_used(&self) -> u32 {
		self.retries_used
	}

	/// Advance retry state and compute the backoff delay for the next attempt.
	pub fn next_backoff(&mut self) -> Option<Duration> {
		if !self.can_retry() {
			tracing::debug!(attempt = self.retries_used, "retry budget exhausted");

			return None;
		}

		let attempt = self.retries_used;

		self.retries_used = self.retries_used.saturating_add(1);

		let delay = self.policy.retry_delay.saturating_mul(attempt.saturating_add(1));

		tracing::debug!(attempt = attempt + 1, ?delay, "retry backoff computed");

		Some(delay)
	}

	/// Sleep for the computed backoff window if retrying is permitted.
	pub async fn sleep_backoff(&mut self) {
		if let Some(delay) = self.next_backoff()
			&& !delay.is_zero()
		{
			time::sleep(delay).await;
		}
	}
}
