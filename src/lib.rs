//! wp-census: WordPress adoption census over ranked domain lists
//!
//! This crate probes batches of domains with bounded concurrency, classifies
//! each response against a fixed catalogue of WordPress signatures, and
//! records one verdict per domain so that an interrupted batch can be resumed
//! without probing anything twice.

pub mod config;
pub mod output;
pub mod probe;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for wp-census operations
#[derive(Debug, Error)]
pub enum CensusError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Batch {batch_id} still has {remaining} untested domains")]
    BatchNotExhausted { batch_id: i64, remaining: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Hostname and URL errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Empty hostname")]
    EmptyHost,

    #[error("Malformed hostname: {0}")]
    Malformed(String),
}

/// Result type alias for wp-census operations
pub type Result<T> = std::result::Result<T, CensusError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use probe::{classify, Coordinator, ProbeResult, RunOutcome};
pub use state::{DomainStatus, RunCounters, Verdict};
