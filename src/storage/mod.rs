//! Storage module for persisting batches and domain verdicts
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Batch selection by `started`/`completed` flags
//! - Paged selection of untested domains
//! - Forward-only domain status updates

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::DomainStatus;
use crate::CensusError;

use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, CensusError> {
    SqliteStorage::new(path)
}

/// Represents a domain in the database
#[derive(Debug, Clone, PartialEq)]
pub struct DomainRecord {
    pub id: i64,
    pub domain: String,
    pub batch_id: i64,
    pub status: DomainStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Represents an imported batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRecord {
    pub id: i64,
    pub provider: String,
    pub started: bool,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl BatchRecord {
    /// Returns true if the batch was started and never completed
    pub fn is_resumable(&self) -> bool {
        self.started && !self.completed
    }
}
