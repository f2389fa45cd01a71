//! HTTP fetcher implementation
//!
//! This module handles the single request each domain receives, including:
//! - Building the HTTP client with the prober's identity string
//! - Following redirects up to a bounded hop count
//! - Capturing status, headers, and body of the final response
//! - Collapsing every failure into a `ProbeResult::Failure`

use crate::config::UserAgentConfig;
use reqwest::{redirect::Policy, Client};
use std::error::Error as _;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use url::Url;

/// Connection setup gets its own bound, capped by the overall request timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest body prefix kept per response; signatures live in the head and markup
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Captured response of a successful probe
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResponse {
    /// HTTP status code of the final response
    pub status: u16,

    /// Response headers in wire order; a name may appear more than once
    pub headers: Vec<(String, String)>,

    /// Raw body bytes
    pub body: Vec<u8>,
}

impl ProbeResponse {
    /// Builds a `200 OK` response with the given body and no headers
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Adds a header, keeping any existing values for the same name
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Iterates over every value of a header, matching the name case-insensitively
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Why a probe produced no response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No response within the per-request timeout
    Timeout,

    /// Connection refused, reset, or DNS failure
    Connect,

    /// TLS handshake or certificate failure
    Tls,

    /// Redirect chain longer than the configured hop count
    RedirectLimit,

    /// The server answered with a 4xx or 5xx status
    HttpStatus(u16),

    /// The body could not be read or decoded
    Body,

    /// The imported hostname cannot form a URL
    InvalidHost,

    /// Anything else, including an aborted probe task
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Connect => write!(f, "connection error"),
            Self::Tls => write!(f, "TLS error"),
            Self::RedirectLimit => write!(f, "redirect limit exceeded"),
            Self::HttpStatus(code) => write!(f, "HTTP {}", code),
            Self::Body => write!(f, "unreadable body"),
            Self::InvalidHost => write!(f, "invalid host"),
            Self::Other => write!(f, "probe failed"),
        }
    }
}

/// Result of probing one domain
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeResult {
    /// The domain answered
    Response(ProbeResponse),

    /// The domain did not produce a usable response
    Failure {
        /// Failure category (all categories classify the same way)
        kind: FailureKind,
        /// Error description for logs
        message: String,
    },
}

impl ProbeResult {
    /// Builds a failure marker
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    /// Returns true for failure markers
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }
}

/// Issues the request for a single probe
///
/// Implementations must never panic on network errors: every outcome is a
/// `ProbeResult`.
pub trait Transport: Send + Sync + 'static {
    /// Fetches the given root URL
    fn fetch(&self, url: Url) -> impl Future<Output = ProbeResult> + Send;
}

/// Builds an HTTP client with the probe configuration
///
/// # Arguments
///
/// * `user_agent` - Identity sent with every request
/// * `timeout` - Total per-request timeout
/// * `max_redirects` - Redirect hops followed before the request fails
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use wp_census::config::UserAgentConfig;
/// use wp_census::probe::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "WpCensus".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&user_agent, Duration::from_secs(10), 5).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
    max_redirects: u32,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .redirect(Policy::limited(max_redirects as usize))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Transport backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with a freshly built client
    pub fn new(
        user_agent: &UserAgentConfig,
        timeout: Duration,
        max_redirects: u32,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(user_agent, timeout, max_redirects)?,
        })
    }
}

impl Transport for HttpTransport {
    async fn fetch(&self, url: Url) -> ProbeResult {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return failure_from_error(&e),
        };

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return ProbeResult::failure(
                FailureKind::HttpStatus(status.as_u16()),
                format!("{} answered HTTP {}", url, status.as_u16()),
            );
        }

        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        match read_capped_body(response, MAX_BODY_BYTES).await {
            Ok(body) => ProbeResult::Response(ProbeResponse {
                status: status.as_u16(),
                headers,
                body,
            }),
            Err(e) => failure_from_error(&e),
        }
    }
}

/// Reads at most `limit` bytes of a body and drops the connection after that
async fn read_capped_body(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, reqwest::Error> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit - body.len();
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            tracing::trace!("Body of {} truncated at {} bytes", response.url(), limit);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Maps a reqwest error onto a failure marker
fn failure_from_error(e: &reqwest::Error) -> ProbeResult {
    let kind = if e.is_timeout() {
        FailureKind::Timeout
    } else if e.is_redirect() {
        FailureKind::RedirectLimit
    } else if e.is_connect() {
        if is_tls_error(e) {
            FailureKind::Tls
        } else {
            FailureKind::Connect
        }
    } else if e.is_body() || e.is_decode() {
        FailureKind::Body
    } else {
        FailureKind::Other
    };

    ProbeResult::failure(kind, e.to_string())
}

/// Walks the error source chain looking for a TLS failure
fn is_tls_error(e: &reqwest::Error) -> bool {
    let mut source = e.source();
    while let Some(err) = source {
        let text = err.to_string().to_ascii_lowercase();
        if text.contains("certificate") || text.contains("tls") || text.contains("handshake") {
            return true;
        }
        source = err.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestCensus".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&create_test_config(), Duration::from_secs(10), 5);
        assert!(client.is_ok());
    }

    #[test]
    fn test_user_agent_format() {
        assert_eq!(
            create_test_config().header_value(),
            "TestCensus/1.0 (+https://example.com/about; admin@example.com)"
        );
    }

    #[test]
    fn test_header_values_are_case_insensitive_and_multi_valued() {
        let response = ProbeResponse::ok("body")
            .with_header("Link", "<https://a.test/>; rel=canonical")
            .with_header("link", "<https://a.test/wp-json/>; rel=\"https://api.w.org/\"")
            .with_header("Server", "nginx");

        let links: Vec<_> = response.header_values("LINK").collect();
        assert_eq!(links.len(), 2);
        assert!(links[1].contains("wp-json"));
        assert_eq!(response.header_values("x-pingback").count(), 0);
    }

    #[test]
    fn test_failure_marker() {
        let result = ProbeResult::failure(FailureKind::Timeout, "slow");
        assert!(result.is_failure());
        assert!(!ProbeResult::Response(ProbeResponse::ok("x")).is_failure());
        assert_eq!(FailureKind::HttpStatus(503).to_string(), "HTTP 503");
    }
}
