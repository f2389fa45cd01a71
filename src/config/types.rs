use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for wp-census
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
}

/// Probe dispatch configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Per-request timeout in seconds
    #[serde(rename = "request-timeout")]
    pub request_timeout: u64,

    /// Number of untested domains pulled per chunk
    #[serde(rename = "chunk-size")]
    pub chunk_size: u32,

    /// Maximum number of requests in flight at once
    pub concurrency: u32,

    /// Maximum redirect hops followed before the probe counts as failed
    #[serde(rename = "max-redirects")]
    pub max_redirects: u32,

    /// Scheme used to build the root URL of every domain
    pub scheme: String,

    /// Untested domains skipped at the start of every chunk pull
    pub offset: u64,

    /// Continue the oldest started but unfinished batch
    pub resume: bool,
}

impl ProbeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            request_timeout: 10,
            chunk_size: 200,
            concurrency: 200,
            max_redirects: 5,
            scheme: "https".to_string(),
            offset: 0,
            resume: false,
        }
    }
}

/// Progress reporting configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Emit a progress line every N processed domains
    #[serde(rename = "report-every")]
    pub report_every: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self { report_every: 200 }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the prober
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the prober
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the probe traffic
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for probe-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the identity string sent with every request
    ///
    /// Format: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}
