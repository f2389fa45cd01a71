//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the wp-census database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Dataset import units
CREATE TABLE IF NOT EXISTS batches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    provider TEXT NOT NULL,
    started INTEGER NOT NULL DEFAULT 0,
    completed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_batches_flags ON batches(started, completed);

-- Imported domains and their classification status
CREATE TABLE IF NOT EXISTS domains (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    domain TEXT NOT NULL,
    batch_id INTEGER NOT NULL REFERENCES batches(id),
    status TEXT NOT NULL DEFAULT 'untested',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_domains_batch_status ON domains(batch_id, status, id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
