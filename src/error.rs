//! Crate-wide error types and `Result` alias.

// crates.io
use reqwest::StatusCode;

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the embed cache crate.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	Serde(#[from] serde_json::Error),
	#[error(transparent)]
	Url(#[from] url::ParseError),

	#[error(transparent)]
	Api(#[from] NormalizedError),

	#[error("No chart identifier recognized in '{input}'.")]
	UnrecognizedChartUrl { input: String },
	#[error("Resource '{resource_id}' is not tracked by the cache.")]
	NotTracked { resource_id: String },
	#[error("Validation failed for {field}: {reason}")]
	Validation { field: &'static str, reason: String },
}

/// Uniform failure shape produced by the request executor, regardless of
/// whether the underlying cause was a transport error, a timeout, or a
/// non-2xx response.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct NormalizedError {
	/// Human-readable failure description.
	pub message: String,
	/// HTTP status when the origin answered; `None` for pure network or
	/// timeout failures.
	pub status: Option<StatusCode>,
	/// Machine-readable failure kind, when one applies.
	pub code: Option<String>,
	/// JSON error body returned by the origin, when parseable.
	pub details: Option<serde_json::Value>,
}
impl NormalizedError {
	/// Classify a non-2xx response together with whatever error body it carried.
	pub fn from_status(status: StatusCode, details: serde_json::Value) -> Self {
		let message = details
			.get("message")
			.and_then(|value| value.as_str())
			.map(|s| s.to_string())
			.unwrap_or_else(|| format!("Request failed with status {status}."));
		let code = details.get("code").and_then(|value| value.as_str()).map(|s| s.to_string());

		Self { message, status: Some(status), code, details: Some(details) }
	}

	/// Classify a transport-level failure; timeouts are tagged with a
	/// `timeout` code so callers can distinguish them.
	pub fn from_transport(error: &reqwest::Error) -> Self {
		let code = error.is_timeout().then(|| "timeout".to_string());

		Self { message: error.to_string(), status: None, code, details: None }
	}

	/// Whether the failure was cut short by the per-attempt timeout.
	pub fn is_timeout(&self) -> bool {
		self.code.as_deref() == Some("timeout")
	}
}
