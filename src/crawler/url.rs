//! URL normalization and frontier candidate extraction
//!
//! Normalization is purely syntactic: parse, resolve dot segments, lowercase
//! scheme and host (as the WHATWG parser does), drop the fragment. No further
//! canonicalization is attempted, so `/a` and `/a/` stay distinct URLs.

use std::collections::HashSet;
use url::Url;

use crate::utils::error::ParseError;

/// Parse and validate an absolute http(s) URL
fn checked(url: Url, raw: &str) -> Result<Url, ParseError> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ParseError::UnsupportedScheme {
            scheme: url.scheme().to_string(),
            url: raw.to_string(),
        });
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ParseError::MissingHost(raw.to_string()));
    }
    Ok(url)
}

fn finish(mut url: Url) -> String {
    url.set_fragment(None);
    url.to_string()
}

/// Normalize an absolute http(s) URL
///
/// # Examples
///
/// ```
/// use fleetcrawl::crawler::url::normalize_url;
///
/// let url = normalize_url("HTTPS://Example.com/a/./b/../c#top").unwrap();
/// assert_eq!(url, "https://example.com/a/c");
/// ```
pub fn normalize_url(raw: &str) -> Result<String, ParseError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| ParseError::InvalidUrl(format!("{trimmed}: {e}")))?;
    checked(url, trimmed).map(finish)
}

/// Resolve `href` against `base` and normalize the result
pub fn resolve_link(base: &Url, href: &str) -> Result<String, ParseError> {
    let href = href.trim();
    let url = base
        .join(href)
        .map_err(|e| ParseError::InvalidUrl(format!("{href}: {e}")))?;
    checked(url, href).map(finish)
}

/// Turn raw `href` values from one page into distinct absolute http(s) URLs
///
/// Empty and unparseable links and non-http(s) schemes (`mailto:`,
/// `javascript:`) are dropped silently. First-seen order is kept.
pub fn frontier_candidates<S: AsRef<str>>(base: &str, hrefs: &[S]) -> Vec<String> {
    let Ok(base) = Url::parse(base) else {
        tracing::debug!(base, "Base URL does not parse, no candidates");
        return Vec::new();
    };

    let mut seen = HashSet::new();
    hrefs
        .iter()
        .map(AsRef::as_ref)
        .filter(|href| !href.trim().is_empty())
        .filter_map(|href| resolve_link(&base, href).ok())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}
