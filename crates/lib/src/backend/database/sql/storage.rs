//! Key-value operations for the SQL backend.

use std::time::Duration;

use super::{SqlxBackend, SqlxResultExt};
use crate::Result;

pub(super) async fn get(backend: &SqlxBackend, key: &str) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT value_text FROM kv WHERE key_name = $1 AND (expires_at IS NULL OR expires_at > $2)",
    )
    .bind(key)
    .bind(backend.now_millis())
    .fetch_optional(backend.pool())
    .await
    .sql_context("Failed to read value")?;

    Ok(row.map(|(value,)| value))
}

pub(super) async fn set(
    backend: &SqlxBackend,
    key: &str,
    value: String,
    ttl: Option<Duration>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO kv (key_name, value_text, expires_at) VALUES ($1, $2, $3)
         ON CONFLICT (key_name) DO UPDATE SET value_text = excluded.value_text, expires_at = excluded.expires_at",
    )
    .bind(key)
    .bind(value)
    .bind(backend.expiry_for(ttl))
    .execute(backend.pool())
    .await
    .sql_context("Failed to write value")?;

    Ok(())
}

pub(super) async fn set_if_absent(
    backend: &SqlxBackend,
    key: &str,
    value: String,
    ttl: Option<Duration>,
) -> Result<bool> {
    // An expired row must not block creation; only expired rows are removed here.
    sqlx::query("DELETE FROM kv WHERE key_name = $1 AND expires_at IS NOT NULL AND expires_at <= $2")
        .bind(key)
        .bind(backend.now_millis())
        .execute(backend.pool())
        .await
        .sql_context("Failed to purge expired value")?;

    let result = sqlx::query(
        "INSERT INTO kv (key_name, value_text, expires_at) VALUES ($1, $2, $3)
         ON CONFLICT (key_name) DO NOTHING",
    )
    .bind(key)
    .bind(value)
    .bind(backend.expiry_for(ttl))
    .execute(backend.pool())
    .await
    .sql_context("Failed to create value")?;

    Ok(result.rows_affected() == 1)
}

pub(super) async fn take(backend: &SqlxBackend, key: &str) -> Result<Option<String>> {
    // A single DELETE ... RETURNING statement, so only one caller sees the row.
    let row: Option<(String,)> = sqlx::query_as(
        "DELETE FROM kv WHERE key_name = $1 AND (expires_at IS NULL OR expires_at > $2)
         RETURNING value_text",
    )
    .bind(key)
    .bind(backend.now_millis())
    .fetch_optional(backend.pool())
    .await
    .sql_context("Failed to take value")?;

    Ok(row.map(|(value,)| value))
}

pub(super) async fn delete(backend: &SqlxBackend, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM kv WHERE key_name = $1")
        .bind(key)
        .execute(backend.pool())
        .await
        .sql_context("Failed to delete value")?;

    Ok(())
}
