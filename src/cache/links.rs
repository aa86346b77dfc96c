//! Keyed store of chart identities with staleness-driven probe refresh.

// std
use std::collections::{HashMap, HashSet};
// crates.io
use tokio::sync::{Mutex, RwLock};
// self
use crate::{
	_prelude::*,
	cache::{
		clock::{Clock, SystemClock},
		entry::ChartUrlEntry,
	},
	http::client::ApiClient,
	metrics::{CacheMetrics, CacheMetricsSnapshot},
	parse::{self, ParsedChartUrl},
};

/// Default staleness window before a cached identity is re-validated.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// Default timeout for the existence probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Default iframe width emitted by [`ChartLinkCache::iframe_markup`].
pub const DEFAULT_IFRAME_WIDTH: u32 = 600;
/// Default iframe height emitted by [`ChartLinkCache::iframe_markup`].
pub const DEFAULT_IFRAME_HEIGHT: u32 = 400;

/// Result of probing a tracked chart for existence.
#[derive(Clone, Debug)]
pub struct ProbeOutcome {
	/// The URL currently considered authoritative, possibly stale.
	pub url: Url,
	/// Whether the origin answered the existence check at all.
	pub reachable: bool,
}

/// Builder for [`ChartLinkCache`].
#[derive(Debug, Default)]
pub struct ChartLinkCacheBuilder {
	refresh_interval: Option<Duration>,
	probe_timeout: Option<Duration>,
	clock: Option<Arc<dyn Clock>>,
	client: Option<ApiClient>,
}
impl ChartLinkCacheBuilder {
	/// Create a builder with default configuration.
	pub fn new() -> Self {
		Self::default()
	}

	/// Override the staleness window (defaults to five minutes).
	pub fn refresh_interval(mut self, value: Duration) -> Self {
		self.refresh_interval = Some(value);

		self
	}

	/// Override the existence-probe timeout.
	pub fn probe_timeout(mut self, value: Duration) -> Self {
		self.probe_timeout = Some(value);

		self
	}

	/// Inject a time source (primarily for tests).
	pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = Some(clock);

		self
	}

	/// Use the supplied [`ApiClient`] for probes instead of building one.
	pub fn client(mut self, client: ApiClient) -> Self {
		self.client = Some(client);

		self
	}

	/// Finalise the configuration and construct a [`ChartLinkCache`].
	pub fn build(self) -> Result<ChartLinkCache> {
		let probe_timeout = self.probe_timeout.unwrap_or(DEFAULT_PROBE_TIMEOUT);

		if probe_timeout.is_zero() {
			return Err(Error::Validation {
				field: "probe_timeout",
				reason: "Must be greater than zero.".into(),
			});
		}

		let client = match self.client {
			Some(client) => client,
			None => ApiClient::new()?,
		};

		Ok(ChartLinkCache {
			entries: Arc::new(RwLock::new(HashMap::new())),
			probe_locks: Arc::new(Mutex::new(HashMap::new())),
			client,
			clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
			refresh_interval: self.refresh_interval.unwrap_or(DEFAULT_REFRESH_INTERVAL),
			probe_timeout,
			metrics: CacheMetrics::new(),
		})
	}
}

/// Tracks the shifting identity of externally embedded charts.
///
/// Every entry point degrades gracefully: unparseable inputs are served back
/// unchanged and probe failures only downgrade the advisory validity flag, so
/// a previously working embed keeps rendering regardless of connectivity.
#[derive(Clone, Debug)]
pub struct ChartLinkCache {
	entries: Arc<RwLock<HashMap<String, Arc<RwLock<ChartUrlEntry>>>>>,
	// Serializes probes per resource id; concurrent resolutions of one key
	// share a single in-flight refresh instead of racing writes.
	probe_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
	client: ApiClient,
	clock: Arc<dyn Clock>,
	refresh_interval: Duration,
	probe_timeout: Duration,
	metrics: Arc<CacheMetrics>,
}
impl ChartLinkCache {
	/// Create a cache with default settings.
	pub fn new() -> Result<Self> {
		Self::builder().build()
	}

	/// Create a [`ChartLinkCacheBuilder`] for advanced configuration.
	pub fn builder() -> ChartLinkCacheBuilder {
		ChartLinkCacheBuilder::new()
	}

	/// Parse a chart reference and track it.
	///
	/// Parsing doubles as cache population: a successful parse always leaves
	/// an entry behind, even when the caller only wanted to inspect the URL.
	/// Re-parsing an already tracked identifier returns the live entry
	/// without resetting its staleness clock.
	pub async fn parse(&self, input: &str) -> Result<ChartUrlEntry> {
		let parsed = parse::parse_chart_input(input).inspect_err(|_| {
			self.metrics.record_parse_failure();
		})?;
		let arc = self.track(parsed).await;

		Ok(arc.read().await.clone())
	}

	/// Resolve the current URL for a chart reference.
	///
	/// Equivalent to [`resolve_with`](Self::resolve_with) without a forced
	/// refresh.
	pub async fn resolve(&self, original_url: &str) -> String {
		self.resolve_with(original_url, false).await
	}

	/// Resolve the current URL for a chart reference, probing the origin when
	/// the cached identity is stale (or when forced).
	///
	/// Never fails: unparseable inputs come back unchanged, and probe
	/// failures still yield the cached URL.
	#[tracing::instrument(skip(self))]
	pub async fn resolve_with(&self, original_url: &str, force_refresh: bool) -> String {
		self.metrics.record_resolve();

		let entry = match self.parse(original_url).await {
			Ok(entry) => entry,
			Err(error) => {
				tracing::debug!(%error, "unparseable chart reference, serving input unchanged");

				return original_url.to_string();
			},
		};

		if force_refresh || entry.is_stale(self.clock.now(), self.refresh_interval) {
			if let Err(error) = self.probe(&entry.resource_id).await {
				tracing::debug!(%error, "probe skipped");
			}
		} else {
			self.metrics.record_hit();
		}

		let entries = self.entries.read().await;

		match entries.get(&entry.resource_id) {
			Some(arc) => arc.read().await.current_url.to_string(),
			// Evicted while probing; the original input is still renderable.
			None => original_url.to_string(),
		}
	}

	/// Probe the origin for the tracked chart's existence.
	///
	/// The check is tolerant of unreadable responses: any answer from the
	/// origin counts as reachable. Whatever the outcome, the entry's
	/// timestamp is refreshed and its (possibly stale) current URL is
	/// returned; only an untracked identifier is an error.
	#[tracing::instrument(skip(self))]
	pub async fn probe(&self, resource_id: &str) -> Result<ProbeOutcome> {
		let Some(arc) = self.entries.read().await.get(resource_id).cloned() else {
			return Err(Error::NotTracked { resource_id: resource_id.to_string() });
		};
		let lock = self.probe_lock(resource_id).await;
		let _guard = lock.lock().await;
		let check_url = {
			let entry = arc.read().await;

			format!("{}/explore/p/{}", entry.base_url, entry.resource_id)
		};

		self.metrics.record_probe();

		let reachable = self.client.check_reachable(&check_url, self.probe_timeout).await;

		if !reachable {
			self.metrics.record_probe_failure();

			tracing::debug!(resource_id, %check_url, "chart unreachable, validity downgraded");
		}

		let mut entry = arc.write().await;

		entry.mark_probed(reachable, self.clock.now());

		Ok(ProbeOutcome { url: entry.current_url.clone(), reachable })
	}

	/// Rotate a tracked chart to a new identity.
	///
	/// On success the same entry stays reachable under both the old and the
	/// new identifier, keeping previously distributed links alive through the
	/// transition window. Returns false when the new URL does not parse or
	/// the old identifier is not tracked; nothing is mutated in that case.
	#[tracing::instrument(skip(self))]
	pub async fn update_identity(&self, old_resource_id: &str, new_url: &str) -> bool {
		let parsed = match parse::parse_chart_input(new_url) {
			Ok(parsed) => parsed,
			Err(error) => {
				tracing::debug!(%error, "identity update rejected");

				return false;
			},
		};
		let Some(arc) = self.entries.read().await.get(old_resource_id).cloned() else {
			return false;
		};
		let new_resource_id = parsed.resource_id.clone();

		{
			let mut entry = arc.write().await;

			entry.apply_identity(parsed, self.clock.now());
		}

		self.entries.write().await.insert(new_resource_id.clone(), arc);

		tracing::debug!(old_resource_id, %new_resource_id, "chart identifier rotated");

		true
	}

	/// Normalize a chart reference for embedding: force `standalone=1` and
	/// default the `height` parameter to 400 when absent. Unparseable inputs
	/// come back unchanged.
	pub async fn clean_for_embedding(&self, input: &str) -> String {
		match parse::parse_chart_input(input) {
			Ok(parsed) => {
				let url = parsed.url.clone();

				self.track(parsed).await;

				embed_url(url).to_string()
			},
			Err(_) => {
				self.metrics.record_parse_failure();

				input.to_string()
			},
		}
	}

	/// Emit iframe markup for a chart reference with the default 600x400 size.
	pub async fn iframe_markup(&self, url: &str) -> String {
		self.iframe_markup_sized(url, DEFAULT_IFRAME_WIDTH, DEFAULT_IFRAME_HEIGHT).await
	}

	/// Emit iframe markup for a chart reference with an explicit size.
	pub async fn iframe_markup_sized(&self, url: &str, width: u32, height: u32) -> String {
		let src = self.clean_for_embedding(url).await;

		format!(
			"<iframe width=\"{width}\" height=\"{height}\" seamless frameBorder=\"0\" \
			 scrolling=\"no\" src=\"{src}\"></iframe>"
		)
	}

	/// Remove a single key. Returns whether a mapping was present.
	///
	/// A rotated entry reachable under two identifiers stays tracked under
	/// the other one.
	pub async fn evict(&self, resource_id: &str) -> bool {
		let removed = self.entries.write().await.remove(resource_id).is_some();

		if removed {
			self.probe_locks.lock().await.remove(resource_id);
		}

		removed
	}

	/// Drop every tracked entry.
	pub async fn clear(&self) {
		self.entries.write().await.clear();
		self.probe_locks.lock().await.clear();
	}

	/// Read-only snapshot of all tracked entries, one per chart (dual-keyed
	/// entries are listed once).
	pub async fn entries(&self) -> Vec<ChartUrlEntry> {
		let arcs = { self.entries.read().await.values().cloned().collect::<Vec<_>>() };
		let mut seen = HashSet::new();
		let mut snapshot = Vec::with_capacity(arcs.len());

		for arc in arcs {
			let entry = arc.read().await.clone();

			if seen.insert(entry.resource_id.clone()) {
				snapshot.push(entry);
			}
		}

		snapshot
	}

	/// Number of keys currently mapped (a rotated entry counts once per key).
	pub async fn len(&self) -> usize {
		self.entries.read().await.len()
	}

	/// Whether the cache tracks nothing.
	pub async fn is_empty(&self) -> bool {
		self.entries.read().await.is_empty()
	}

	/// Point-in-time snapshot of the cache telemetry counters.
	pub fn metrics(&self) -> CacheMetricsSnapshot {
		self.metrics.snapshot()
	}

	async fn track(&self, parsed: ParsedChartUrl) -> Arc<RwLock<ChartUrlEntry>> {
		let resource_id = parsed.resource_id.clone();

		{
			let entries = self.entries.read().await;

			if let Some(arc) = entries.get(&resource_id) {
				return arc.clone();
			}
		}

		let now = self.clock.now();
		let mut entries = self.entries.write().await;

		entries
			.entry(resource_id)
			.or_insert_with(|| Arc::new(RwLock::new(ChartUrlEntry::new(parsed, now))))
			.clone()
	}

	async fn probe_lock(&self, resource_id: &str) -> Arc<Mutex<()>> {
		let mut locks = self.probe_locks.lock().await;

		locks.entry(resource_id.to_string()).or_default().clone()
	}
}

fn embed_url(mut url: Url) -> Url {
	let mut pairs = url
		.query_pairs()
		.into_owned()
		.filter(|(key, _)| key != "standalone")
		.collect::<Vec<_>>();

	pairs.push(("standalone".into(), "1".into()));

	if !pairs.iter().any(|(key, _)| key == "height") {
		pairs.push(("height".into(), "400".into()));
	}

	url.query_pairs_mut().clear().extend_pairs(pairs);

	url
}
