//! Integration tests for chart identity resolution, staleness refresh, and
//! identifier rotation.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use chrono::TimeDelta;
use embed_cache::{ChartLinkCache, Error, ManualClock};
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{method, path},
};

fn cache_with_clock(clock: Arc<ManualClock>) -> ChartLinkCache {
	ChartLinkCache::builder()
		.refresh_interval(Duration::from_secs(300))
		.probe_timeout(Duration::from_secs(1))
		.clock(clock)
		.build()
		.expect("cache")
}

#[tokio::test]
async fn fresh_entry_resolves_without_probing() {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	Mock::given(method("HEAD")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

	let clock = Arc::new(ManualClock::starting_now());
	let cache = cache_with_clock(clock);
	let url = format!("{}/explore/p/abc?foo=bar", server.uri());
	let resolved = cache.resolve(&url).await;

	assert_eq!(resolved, url);
	assert_eq!(cache.metrics().probes, 0);
	assert_eq!(cache.metrics().cache_hits, 1);

	server.verify().await;
}

#[tokio::test]
async fn stale_entry_triggers_exactly_one_probe() {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	Mock::given(method("HEAD"))
		.and(path("/explore/p/abc"))
		.respond_with(ResponseTemplate::new(200))
		.expect(1)
		.mount(&server)
		.await;

	let clock = Arc::new(ManualClock::starting_now());
	let cache = cache_with_clock(clock.clone());
	let url = format!("{}/explore/p/abc", server.uri());
	let _ = cache.resolve(&url).await;

	clock.advance(TimeDelta::seconds(301));

	let resolved = cache.resolve(&url).await;

	assert_eq!(resolved, url);

	// The probe refreshed the timestamp, so the next resolve is a plain hit.
	let resolved = cache.resolve(&url).await;

	assert_eq!(resolved, url);
	assert_eq!(cache.metrics().probes, 1);

	server.verify().await;
}

#[tokio::test]
async fn forced_refresh_probes_even_when_fresh() {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	Mock::given(method("HEAD"))
		.and(path("/explore/p/abc"))
		.respond_with(ResponseTemplate::new(200))
		.expect(1)
		.mount(&server)
		.await;

	let clock = Arc::new(ManualClock::starting_now());
	let cache = cache_with_clock(clock);
	let url = format!("{}/explore/p/abc", server.uri());
	let resolved = cache.resolve_with(&url, true).await;

	assert_eq!(resolved, url);

	server.verify().await;
}

#[tokio::test]
async fn unreachable_probe_downgrades_validity_but_still_serves() {
	let _ = tracing_subscriber::fmt::try_init();

	// Nothing listens on port 9; the existence check cannot connect.
	let clock = Arc::new(ManualClock::starting_now());
	let cache = cache_with_clock(clock);
	let url = "http://127.0.0.1:9/explore/p/ghost";
	let entry = cache.parse(url).await.expect("parse");

	assert!(entry.is_valid);

	let outcome = cache.probe("ghost").await.expect("probe reports, never blocks");

	assert!(!outcome.reachable);
	assert_eq!(outcome.url.as_str(), url);

	let resolved = cache.resolve_with(url, true).await;

	assert_eq!(resolved, url);

	let entries = cache.entries().await;

	assert_eq!(entries.len(), 1);
	assert!(!entries[0].is_valid);
	assert_eq!(cache.metrics().probe_failures, 2);
}

#[tokio::test]
async fn unparseable_input_is_served_back_unchanged() {
	let _ = tracing_subscriber::fmt::try_init();

	let cache = ChartLinkCache::new().expect("cache");

	assert_eq!(cache.resolve("not a chart url").await, "not a chart url");
	assert_eq!(cache.resolve("https://x.example/dashboard/list").await, "https://x.example/dashboard/list");
	assert!(cache.is_empty().await);
	assert_eq!(cache.metrics().parse_failures, 2);
}

#[tokio::test]
async fn rotated_identifier_resolves_to_the_same_current_url_under_both_ids() {
	let _ = tracing_subscriber::fmt::try_init();

	let clock = Arc::new(ManualClock::starting_now());
	let cache = cache_with_clock(clock);
	let old_url = "https://bi.example.com/explore/p/oldid?foo=bar";
	let new_url = "https://bi.example.com/explore/p/newid?foo=bar";

	cache.parse(old_url).await.expect("parse");
	assert!(cache.update_identity("oldid", new_url).await);

	assert_eq!(cache.resolve(old_url).await, new_url);
	assert_eq!(cache.resolve(new_url).await, new_url);

	// One chart, two keys.
	assert_eq!(cache.entries().await.len(), 1);
	assert_eq!(cache.len().await, 2);
}

#[tokio::test]
async fn identity_update_rejects_bad_urls_and_unknown_ids() {
	let _ = tracing_subscriber::fmt::try_init();

	let cache = ChartLinkCache::new().expect("cache");

	cache.parse("https://bi.example.com/explore/p/known").await.expect("parse");

	assert!(!cache.update_identity("known", "not a url").await);
	assert!(!cache.update_identity("unknown", "https://bi.example.com/explore/p/next").await);
	assert_eq!(
		cache.resolve("https://bi.example.com/explore/p/known").await,
		"https://bi.example.com/explore/p/known"
	);
}

#[tokio::test]
async fn probing_an_untracked_id_is_a_not_tracked_error() {
	let _ = tracing_subscriber::fmt::try_init();

	let cache = ChartLinkCache::new().expect("cache");

	assert!(matches!(cache.probe("nobody").await, Err(Error::NotTracked { .. })));
}

#[tokio::test]
async fn eviction_and_clear_remove_entries() {
	let _ = tracing_subscriber::fmt::try_init();

	let cache = ChartLinkCache::new().expect("cache");

	cache.parse("https://bi.example.com/explore/p/one").await.expect("parse");
	cache.parse("https://bi.example.com/explore/p/two").await.expect("parse");

	assert_eq!(cache.len().await, 2);
	assert!(cache.evict("one").await);
	assert!(!cache.evict("one").await);
	assert_eq!(cache.len().await, 1);

	cache.clear().await;

	assert!(cache.is_empty().await);
}

#[tokio::test]
async fn embedding_helpers_normalize_and_wrap() {
	let _ = tracing_subscriber::fmt::try_init();

	let cache = ChartLinkCache::new().expect("cache");
	let cleaned = cache.clean_for_embedding("https://x.example/explore/p/abc?height=900").await;

	assert_eq!(cleaned, "https://x.example/explore/p/abc?height=900&standalone=1");

	let cleaned = cache.clean_for_embedding("https://x.example/chart/def").await;

	assert_eq!(cleaned, "https://x.example/chart/def?standalone=1&height=400");
	assert_eq!(cache.clean_for_embedding("garbage").await, "garbage");

	let markup = cache.iframe_markup("https://x.example/chart/def").await;

	assert_eq!(
		markup,
		"<iframe width=\"600\" height=\"400\" seamless frameBorder=\"0\" scrolling=\"no\" \
		 src=\"https://x.example/chart/def?standalone=1&height=400\"></iframe>"
	);

	// Embedding normalization tracks the charts too.
	assert_eq!(cache.len().await, 2);
}
