//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::DomainStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{BatchRecord, DomainRecord};
use crate::CensusError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const BATCH_COLUMNS: &str = "id, provider, started, completed, created_at, updated_at";
const DOMAIN_COLUMNS: &str = "id, domain, batch_id, status, created_at, updated_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(CensusError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, CensusError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, CensusError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn batch_from_row(row: &Row<'_>) -> rusqlite::Result<BatchRecord> {
    Ok(BatchRecord {
        id: row.get(0)?,
        provider: row.get(1)?,
        started: row.get(2)?,
        completed: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn domain_from_row(row: &Row<'_>) -> rusqlite::Result<DomainRecord> {
    let raw_status: String = row.get(3)?;
    let status = DomainStatus::from_db_string(&raw_status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown domain status '{}'", raw_status).into(),
        )
    })?;

    Ok(DomainRecord {
        id: row.get(0)?,
        domain: row.get(1)?,
        batch_id: row.get(2)?,
        status,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Batch Management =====

    fn create_batch(&mut self, provider: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO batches (provider, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![provider, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_batch(&self, batch_id: i64) -> StorageResult<BatchRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM batches WHERE id = ?1", BATCH_COLUMNS),
                params![batch_id],
                batch_from_row,
            )
            .optional()?
            .ok_or(StorageError::BatchNotFound(batch_id))
    }

    fn oldest_batch(
        &self,
        started: bool,
        completed: Option<bool>,
    ) -> StorageResult<Option<BatchRecord>> {
        let batch = match completed {
            Some(completed) => self
                .conn
                .query_row(
                    &format!(
                        "SELECT {} FROM batches WHERE started = ?1 AND completed = ?2
                         ORDER BY id LIMIT 1",
                        BATCH_COLUMNS
                    ),
                    params![started, completed],
                    batch_from_row,
                )
                .optional()?,
            None => self
                .conn
                .query_row(
                    &format!(
                        "SELECT {} FROM batches WHERE started = ?1 ORDER BY id LIMIT 1",
                        BATCH_COLUMNS
                    ),
                    params![started],
                    batch_from_row,
                )
                .optional()?,
        };

        Ok(batch)
    }

    fn list_batches(&self) -> StorageResult<Vec<BatchRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM batches ORDER BY id", BATCH_COLUMNS))?;

        let batches = stmt
            .query_map([], batch_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(batches)
    }

    fn mark_batch_started(&mut self, batch_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE batches SET started = 1, updated_at = ?1 WHERE id = ?2",
            params![now, batch_id],
        )?;
        if changed == 0 {
            return Err(StorageError::BatchNotFound(batch_id));
        }
        Ok(())
    }

    fn mark_batch_completed(&mut self, batch_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE batches SET completed = 1, updated_at = ?1 WHERE id = ?2",
            params![now, batch_id],
        )?;
        if changed == 0 {
            return Err(StorageError::BatchNotFound(batch_id));
        }
        Ok(())
    }

    // ===== Domain Management =====

    fn insert_domains(&mut self, batch_id: i64, domains: &[String]) -> StorageResult<u64> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO domains (domain, batch_id, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
            )?;
            for domain in domains {
                stmt.execute(params![
                    domain,
                    batch_id,
                    DomainStatus::Untested.to_db_string(),
                    now
                ])?;
                inserted += 1;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn get_domain(&self, domain_id: i64) -> StorageResult<DomainRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM domains WHERE id = ?1", DOMAIN_COLUMNS),
                params![domain_id],
                domain_from_row,
            )
            .optional()?
            .ok_or(StorageError::DomainNotFound(domain_id))
    }

    fn untested_domains(
        &self,
        batch_id: i64,
        offset: u64,
        limit: u32,
    ) -> StorageResult<Vec<DomainRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM domains WHERE batch_id = ?1 AND status = ?2
             ORDER BY id LIMIT ?3 OFFSET ?4",
            DOMAIN_COLUMNS
        ))?;

        // SQLite integers are signed 64-bit
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);

        let domains = stmt
            .query_map(
                params![
                    batch_id,
                    DomainStatus::Untested.to_db_string(),
                    limit,
                    offset
                ],
                domain_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(domains)
    }

    fn update_domain_status(
        &mut self,
        domain_id: i64,
        status: DomainStatus,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let current = self.get_domain(domain_id)?;
        if !current.status.can_transition_to(status) {
            tracing::warn!(
                "Refusing to move domain {} ({}) from {} to {}",
                domain_id,
                current.domain,
                current.status,
                status
            );
            return Ok(false);
        }

        // The status guard keeps the write forward-only even against a second writer
        let changed = self.conn.execute(
            "UPDATE domains SET status = ?1, updated_at = ?2
             WHERE id = ?3 AND (status = ?4 OR status = ?1)",
            params![
                status.to_db_string(),
                updated_at.to_rfc3339(),
                domain_id,
                DomainStatus::Untested.to_db_string()
            ],
        )?;

        Ok(changed > 0)
    }

    // ===== Statistics =====

    fn count_domains_by_status(&self, batch_id: i64, status: DomainStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM domains WHERE batch_id = ?1 AND status = ?2",
            params![batch_id, status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_domains(&self, batch_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM domains WHERE batch_id = ?1",
            params![batch_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
