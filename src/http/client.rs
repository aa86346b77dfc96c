//! HTTP API client with timeout-bounded, backoff-governed retries.

// crates.io
use reqwest::{
	Client, Method,
	header::{CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	error::NormalizedError,
	http::{
		policy::{PolicyOverrides, RequestPolicy},
		retry::RetryExecutor,
	},
};

/// Result type for executor calls; failures are always classified into
/// [`NormalizedError`].
pub type ApiResult<T> = std::result::Result<T, NormalizedError>;

/// Structured envelope returned by the chart backend.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ApiResponse {
	/// Whether the backend reported the operation as successful.
	#[serde(default)]
	pub success: bool,
	/// Payload returned on success.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
	/// Error payload returned on failure.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<Value>,
	/// Human-readable message accompanying the result.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

/// Builder for [`ApiClient`].
#[derive(Debug, Default)]
pub struct ApiClientBuilder {
	base_url: Option<Url>,
	policy: RequestPolicy,
	headers: HeaderMap,
	client: Option<Client>,
}
impl ApiClientBuilder {
	/// Create a builder with default configuration.
	pub fn new() -> Self {
		Self::default()
	}

	/// Set the base URL relative request paths are joined onto.
	pub fn base_url(mut self, base_url: impl AsRef<str>) -> Result<Self> {
		self.base_url = Some(Url::parse(base_url.as_ref())?);

		Ok(self)
	}

	/// Replace the default request policy.
	pub fn policy(mut self, policy: RequestPolicy) -> Self {
		self.policy = policy;

		self
	}

	/// Add a header sent with every request.
	pub fn default_header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Use the supplied reqwest client instead of building one (primarily for tests).
	pub fn client(mut self, client: Client) -> Self {
		self.client = Some(client);

		self
	}

	/// Finalise the configuration and construct an [`ApiClient`].
	pub fn build(self) -> Result<ApiClient> {
		self.policy.validate()?;

		let client = match self.client {
			Some(client) => client,
			None => Client::builder()
				.user_agent(format!("embed-cache/{}", env!("CARGO_PKG_VERSION")))
				.connect_timeout(Duration::from_secs(5))
				.build()?,
		};

		Ok(ApiClient {
			client,
			base_url: self.base_url,
			policy: self.policy,
			headers: self.headers,
		})
	}
}

/// Executes HTTP calls against the chart backend with per-attempt timeouts,
/// failure classification, and backoff-paced retries.
#[derive(Clone, Debug)]
pub struct ApiClient {
	client: Client,
	base_url: Option<Url>,
	policy: RequestPolicy,
	headers: HeaderMap,
}
impl ApiClient {
	/// Create a client with default settings and no base URL.
	pub fn new() -> Result<Self> {
		Self::builder().build()
	}

	/// Create an [`ApiClientBuilder`] for advanced configuration.
	pub fn builder() -> ApiClientBuilder {
		ApiClientBuilder::new()
	}

	/// Issue a GET request.
	pub async fn get(
		&self,
		path: &str,
		overrides: Option<PolicyOverrides>,
	) -> ApiResult<ApiResponse> {
		self.execute(Method::GET, path, None, overrides).await
	}

	/// Issue a POST request with a JSON body.
	pub async fn post(
		&self,
		path: &str,
		body: Value,
		overrides: Option<PolicyOverrides>,
	) -> ApiResult<ApiResponse> {
		self.execute(Method::POST, path, Some(body), overrides).await
	}

	/// Issue a PUT request with a JSON body.
	pub async fn put(
		&self,
		path: &str,
		body: Value,
		overrides: Option<PolicyOverrides>,
	) -> ApiResult<ApiResponse> {
		self.execute(Method::PUT, path, Some(body), overrides).await
	}

	/// Issue a PATCH request with a JSON body.
	pub async fn patch(
		&self,
		path: &str,
		body: Value,
		overrides: Option<PolicyOverrides>,
	) -> ApiResult<ApiResponse> {
		self.execute(Method::PATCH, path, Some(body), overrides).await
	}

	/// Issue a DELETE request.
	pub async fn delete(
		&self,
		path: &str,
		overrides: Option<PolicyOverrides>,
	) -> ApiResult<ApiResponse> {
		self.execute(Method::DELETE, path, None, overrides).await
	}

	/// Execute one logical call: attempt, classify, consult the retry
	/// predicate, back off, repeat until success or exhaustion.
	///
	/// The per-attempt timeout is attached to the request itself, so a losing
	/// attempt is cancelled at the transport rather than left in flight.
	#[tracing::instrument(skip(self, body, overrides), fields(%method, path))]
	pub async fn execute<T>(
		&self,
		method: Method,
		path: &str,
		body: Option<Value>,
		overrides: Option<PolicyOverrides>,
	) -> ApiResult<T>
	where
		T: DeserializeOwned,
	{
		let policy = self.policy.merged(overrides.as_ref());
		let url = self.build_url(path, overrides.as_ref().and_then(|o| o.base_url.clone()))?;
		let mut executor = RetryExecutor::new(&policy);

		loop {
			match self.attempt(&method, &url, body.as_ref(), policy.timeout).await {
				Ok(value) => return Ok(value),
				Err(error) => {
					if executor.can_retry() && (policy.retry_on)(&error) {
						tracing::debug!(
							%url,
							status = ?error.status,
							attempt = executor.retries_used() + 1,
							"attempt failed, retrying"
						);

						executor.sleep_backoff().await;

						continue;
					}

					tracing::warn!(%url, status = ?error.status, %error, "request failed");

					return Err(error);
				},
			}
		}
	}

	/// Lightweight existence check: issue a HEAD request and report whether
	/// the origin answered at all. Any response counts as reachable, even one
	/// whose status is an error; only transport failures do not.
	pub async fn check_reachable(&self, url: &str, timeout: Duration) -> bool {
		match self.client.head(url).timeout(timeout).send().await {
			Ok(response) => {
				tracing::debug!(%url, status = %response.status(), "existence check answered");

				true
			},
			Err(error) => {
				tracing::debug!(%url, %error, "existence check unreachable");

				false
			},
		}
	}

	async fn attempt<T>(
		&self,
		method: &Method,
		url: &Url,
		body: Option<&Value>,
		timeout: Duration,
	) -> ApiResult<T>
	where
		T: DeserializeOwned,
	{
		let mut builder = self
			.client
			.request(method.clone(), url.clone())
			.timeout(timeout)
			.header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
			.headers(self.headers.clone());

		if let Some(body) = body {
			builder = builder.json(body);
		}

		let response = match builder.send().await {
			Ok(response) => response,
			Err(error) => return Err(NormalizedError::from_transport(&error)),
		};
		let status = response.status();

		if !status.is_success() {
			let details =
				response.json::<Value>().await.unwrap_or(Value::Object(Default::default()));

			return Err(NormalizedError::from_status(status, details));
		}

		response.json::<T>().await.map_err(|error| NormalizedError::from_transport(&error))
	}

	fn build_url(&self, path: &str, base_override: Option<Url>) -> ApiResult<Url> {
		if let Ok(url) = Url::parse(path) {
			return Ok(url);
		}

		let base = base_override.or_else(|| self.base_url.clone());
		let Some(base) = base else {
			return Err(NormalizedError {
				message: format!("No base URL configured for relative path '{path}'."),
				status: None,
				code: Some("config".into()),
				details: None,
			});
		};

		base.join(path).map_err(|error| NormalizedError {
			message: format!("Failed to join '{path}' onto '{base}': {error}."),
			status: None,
			code: Some("config".into()),
			details: None,
		})
	}
}
