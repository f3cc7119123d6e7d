//! SQL schema for the key-value table.
//!
//! The schema is portable between SQLite and Postgres: a single `kv` table
//! plus a `schema_version` row recording the layout a database was created
//! with. A database stamped with any other version is refused on open rather
//! than read with the wrong layout.

use crate::Result;
use crate::backend::errors::BackendError;

use super::SqlxBackend;

/// Schema version this build reads and writes.
pub const SCHEMA_VERSION: i64 = 1;

/// SQL statements to create the schema tables.
///
/// Each statement uses portable SQL that works on both SQLite and PostgreSQL.
pub const CREATE_TABLES: &[&str] = &[
    // Schema version tracking
    // BIGINT (64-bit) used for portability between SQLite and PostgreSQL
    "CREATE TABLE IF NOT EXISTS schema_version (
        version BIGINT PRIMARY KEY
    )",
    // Key-value storage shared by every store.
    // expires_at is milliseconds since the Unix epoch; NULL never expires.
    "CREATE TABLE IF NOT EXISTS kv (
        key_name TEXT PRIMARY KEY NOT NULL,
        value_text TEXT NOT NULL,
        expires_at BIGINT
    )",
];

/// SQL statements to create indexes.
pub const CREATE_INDEXES: &[&str] =
    &["CREATE INDEX IF NOT EXISTS idx_kv_expires_at ON kv(expires_at)"];

/// Initialize the database schema.
///
/// Creates tables and indexes if they don't exist and stamps a new database
/// with [`SCHEMA_VERSION`]. Fails with [`BackendError::SchemaVersionMismatch`]
/// if the database carries a different version.
pub async fn initialize(backend: &SqlxBackend) -> Result<()> {
    let pool = backend.pool();

    for statement in CREATE_TABLES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| BackendError::SqlxError {
                reason: format!("Schema creation failed: {e} - SQL: {statement}"),
                source: Some(e),
            })?;
    }

    // Check current schema version
    let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM schema_version")
        .fetch_optional(pool)
        .await
        .map_err(|e| BackendError::SqlxError {
            reason: format!("Failed to check schema version: {e}"),
            source: Some(e),
        })?;

    match row {
        None => {
            sqlx::query("INSERT INTO schema_version (version) VALUES ($1)")
                .bind(SCHEMA_VERSION)
                .execute(pool)
                .await
                .map_err(|e| BackendError::SqlxError {
                    reason: format!("Failed to initialize schema version: {e}"),
                    source: Some(e),
                })?;
        }
        Some((found,)) if found != SCHEMA_VERSION => {
            return Err(BackendError::SchemaVersionMismatch {
                found,
                supported: SCHEMA_VERSION,
            }
            .into());
        }
        Some(_) => {}
    }

    for statement in CREATE_INDEXES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| BackendError::SqlxError {
                reason: format!("Index creation failed: {e} - SQL: {statement}"),
                source: Some(e),
            })?;
    }

    Ok(())
}
