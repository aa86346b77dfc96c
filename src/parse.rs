//! Chart URL parsing and identifier extraction.
//!
//! Accepts either a bare URL or an HTML snippet containing an `<iframe>` and
//! extracts the canonical chart identifier from the URL path. Patterns are
//! tested in a fixed priority order; the first match wins.

// std
use std::collections::HashMap;
// self
use crate::_prelude::*;

/// Path-segment markers recognized for identifier extraction, in priority
/// order. The segment following a matched marker is the resource id.
const ID_MARKERS: &[&[&str]] =
	&[&["explore", "p"], &["superset", "explore", "p"], &["chart"], &["embedded"]];

/// Outcome of a successful chart URL parse.
#[derive(Clone, Debug)]
pub struct ParsedChartUrl {
	/// Absolute URL the input resolved to.
	pub url: Url,
	/// Canonical chart identifier extracted from the path.
	pub resource_id: String,
	/// Scheme + host (+ port if present) of the URL.
	pub base_url: String,
	/// Query parameters, duplicates resolved to the last value per key.
	pub parameters: HashMap<String, String>,
}

/// Parse a chart reference into its identity components.
///
/// Fails with [`Error::UnrecognizedChartUrl`] when the input is not an
/// absolute URL or no identifier pattern matches; no state is touched on
/// failure.
pub fn parse_chart_input(input: &str) -> Result<ParsedChartUrl> {
	let candidate = extract_iframe_src(input).unwrap_or_else(|| input.trim());
	let url = Url::parse(candidate)
		.map_err(|_| Error::UnrecognizedChartUrl { input: input.to_string() })?;
	let resource_id = extract_resource_id(&url)
		.ok_or_else(|| Error::UnrecognizedChartUrl { input: input.to_string() })?;
	let base_url = base_url_of(&url)
		.ok_or_else(|| Error::UnrecognizedChartUrl { input: input.to_string() })?;
	let parameters = url.query_pairs().into_owned().collect();

	tracing::debug!(%resource_id, %base_url, "parsed chart url");

	Ok(ParsedChartUrl { url, resource_id, base_url, parameters })
}

/// Extract the `src` attribute of the first `<iframe>` tag in the input, if any.
pub fn extract_iframe_src(input: &str) -> Option<&str> {
	let tag_start = find_ignore_ascii_case(input, "<iframe")?;
	let tag = &input[tag_start..];
	let tag = &tag[..tag.find('>').unwrap_or(tag.len())];
	let src_at = find_ignore_ascii_case(tag, "src=")?;
	let rest = &tag[src_at + 4..];
	let quote = rest.chars().next().filter(|c| matches!(c, '"' | '\''))?;
	let rest = &rest[1..];

	rest.find(quote).map(|end| &rest[..end])
}

/// Extract the chart identifier from a URL path, honoring marker priority.
pub fn extract_resource_id(url: &Url) -> Option<String> {
	let segments = url.path_segments()?.filter(|s| !s.is_empty()).collect::<Vec<_>>();

	ID_MARKERS.iter().find_map(|marker| match_after_marker(&segments, marker))
}

/// Compute scheme + "//" + host (+ port if present) for a URL.
pub fn base_url_of(url: &Url) -> Option<String> {
	let host = url.host_str()?;

	Some(match url.port() {
		Some(port) => format!("{}://{host}:{port}", url.scheme()),
		None => format!("{}://{host}", url.scheme()),
	})
}

fn match_after_marker(segments: &[&str], marker: &[&str]) -> Option<String> {
	segments
		.windows(marker.len())
		.enumerate()
		.find_map(|(index, window)| {
			(window == marker).then(|| segments.get(index + marker.len()).copied()).flatten()
		})
		.map(|id| id.to_string())
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
	haystack
		.as_bytes()
		.windows(needle.len())
		.position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}
