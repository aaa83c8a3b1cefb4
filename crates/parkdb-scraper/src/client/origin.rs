//! URL helpers for the HTTP client and file-or-URL source locations.

/// Extracts the hostname from a URL for use in error messages.
///
/// Falls back to the full URL string if parsing fails.
pub(crate) fn extract_domain(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}

/// Returns `true` when a configured source location should be fetched over
/// HTTP rather than read from the local filesystem.
#[must_use]
pub fn is_remote_location(location: &str) -> bool {
    let lowered = location.trim().to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}

/// Joins a base URL and a path segment with exactly one `/` between them.
#[must_use]
pub fn join_url(base: &str, segment: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        segment.trim_start_matches('/')
    )
}
