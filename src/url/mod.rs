//! Hostname handling for probe targets
//!
//! Imported dataset rows carry bare hostnames. This module normalizes them
//! and builds the single root URL each domain is probed at.

use crate::{UrlError, UrlResult};
use url::Url;

/// Normalizes an imported hostname
///
/// Normalization trims whitespace, lowercases, and drops a trailing root dot.
/// Anything that is not a plain `host` or `host:port` is rejected.
///
/// # Examples
///
/// ```
/// use wp_census::url::normalize_hostname;
///
/// assert_eq!(normalize_hostname(" Example.COM. ").unwrap(), "example.com");
/// assert!(normalize_hostname("example.com/path").is_err());
/// ```
pub fn normalize_hostname(raw: &str) -> UrlResult<String> {
    let host = raw.trim().trim_end_matches('.').to_lowercase();

    if host.is_empty() {
        return Err(UrlError::EmptyHost);
    }

    if host
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '@' | '\\'))
    {
        return Err(UrlError::Malformed(raw.trim().to_string()));
    }

    Ok(host)
}

/// Builds the root URL a domain is probed at
///
/// # Arguments
///
/// * `scheme` - `https` or `http`
/// * `hostname` - The imported hostname
///
/// # Examples
///
/// ```
/// use wp_census::url::probe_url;
///
/// let url = probe_url("https", "Example.com").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/");
/// ```
pub fn probe_url(scheme: &str, hostname: &str) -> UrlResult<Url> {
    if scheme != "https" && scheme != "http" {
        return Err(UrlError::InvalidScheme(scheme.to_string()));
    }

    let host = normalize_hostname(hostname)?;
    let url = Url::parse(&format!("{}://{}/", scheme, host))
        .map_err(|e| UrlError::Parse(format!("{}: {}", host, e)))?;

    if url.host_str().is_none() {
        return Err(UrlError::Malformed(host));
    }

    Ok(url)
}
