//! Storage traits and error types
//!
//! This module defines the trait interface for the persistence collaborator
//! and associated error types.

use crate::state::DomainStatus;
use crate::storage::{BatchRecord, DomainRecord};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Domain not found: {0}")]
    DomainNotFound(i64),

    #[error("Batch not found: {0}")]
    BatchNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The core only reads batches and domains, flips the batch `started` flag,
/// and writes one status per domain. Batch and domain creation exist for the
/// import collaborator.
pub trait Storage {
    // ===== Batch Management =====

    /// Creates a new batch for the given provider label
    ///
    /// # Returns
    ///
    /// The ID of the newly created batch
    fn create_batch(&mut self, provider: &str) -> StorageResult<i64>;

    /// Gets a batch by ID
    fn get_batch(&self, batch_id: i64) -> StorageResult<BatchRecord>;

    /// Gets the oldest batch (lowest ID) matching the flag predicate
    ///
    /// # Arguments
    ///
    /// * `started` - Required value of the `started` flag
    /// * `completed` - Required value of the `completed` flag, or `None` for any
    fn oldest_batch(
        &self,
        started: bool,
        completed: Option<bool>,
    ) -> StorageResult<Option<BatchRecord>>;

    /// Lists every batch, oldest first
    fn list_batches(&self) -> StorageResult<Vec<BatchRecord>>;

    /// Sets `started = true`; idempotent
    fn mark_batch_started(&mut self, batch_id: i64) -> StorageResult<()>;

    /// Sets `completed = true`
    fn mark_batch_completed(&mut self, batch_id: i64) -> StorageResult<()>;

    // ===== Domain Management =====

    /// Inserts untested domains into a batch, preserving the given order
    ///
    /// # Returns
    ///
    /// The number of inserted rows
    fn insert_domains(&mut self, batch_id: i64, domains: &[String]) -> StorageResult<u64>;

    /// Gets a domain by ID
    fn get_domain(&self, domain_id: i64) -> StorageResult<DomainRecord>;

    /// Gets one page of untested domains of a batch, ordered by ID
    ///
    /// # Arguments
    ///
    /// * `batch_id` - The batch to read from
    /// * `offset` - Number of untested rows to skip from the start
    /// * `limit` - Maximum number of rows to return
    fn untested_domains(
        &self,
        batch_id: i64,
        offset: u64,
        limit: u32,
    ) -> StorageResult<Vec<DomainRecord>>;

    /// Writes a terminal status for a domain
    ///
    /// Transitions only move forward: writing the status a domain already
    /// holds is accepted, writing a different terminal status is refused.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The status is now stored
    /// * `Ok(false)` - The domain already holds a different terminal status
    fn update_domain_status(
        &mut self,
        domain_id: i64,
        status: DomainStatus,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<bool>;

    // ===== Statistics =====

    /// Counts domains of a batch holding the given status
    fn count_domains_by_status(&self, batch_id: i64, status: DomainStatus) -> StorageResult<u64>;

    /// Counts all domains of a batch
    fn count_domains(&self, batch_id: i64) -> StorageResult<u64>;
}
