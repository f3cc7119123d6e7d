//! Storage backend error types.
//!
//! This module defines structured error types for backend operations,
//! providing better error context and type safety compared to string-based errors.

use thiserror::Error;

/// Errors that can occur during backend operations.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendError {
    /// Persisted state could not be serialized.
    #[error("Serialization failed")]
    SerializationFailed {
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// Persisted state could not be deserialized.
    #[error("Deserialization failed")]
    DeserializationFailed {
        /// The underlying deserialization error
        #[source]
        source: serde_json::Error,
    },

    /// File I/O error.
    #[error("File I/O error")]
    FileIo {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// SQL backend error.
    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    #[error("SQL error: {reason}")]
    SqlxError {
        /// Description of what failed
        reason: String,
        /// The underlying sqlx error, if any
        #[source]
        source: Option<sqlx::Error>,
    },

    /// The database was created with a schema this build cannot read.
    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    #[error("Database schema version {found} is not supported (expected {supported})")]
    SchemaVersionMismatch {
        /// Version stored in the database
        found: i64,
        /// Version this build uses
        supported: i64,
    },

    /// Backend state is inconsistent.
    #[error("Backend state inconsistency: {reason}")]
    StateInconsistency {
        /// Description of the state inconsistency
        reason: String,
    },
}

impl BackendError {
    /// Check if this error is related to I/O operations.
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            BackendError::FileIo { .. }
                | BackendError::SerializationFailed { .. }
                | BackendError::DeserializationFailed { .. }
        )
    }

    /// Check if this error came from the SQL layer.
    pub fn is_sql_error(&self) -> bool {
        #[cfg(any(feature = "sqlite", feature = "postgres"))]
        {
            matches!(
                self,
                BackendError::SqlxError { .. } | BackendError::SchemaVersionMismatch { .. }
            )
        }
        #[cfg(not(any(feature = "sqlite", feature = "postgres")))]
        {
            false
        }
    }

    /// Check if the database schema version is not the one this build uses.
    pub fn is_schema_version_mismatch(&self) -> bool {
        #[cfg(any(feature = "sqlite", feature = "postgres"))]
        {
            matches!(self, BackendError::SchemaVersionMismatch { .. })
        }
        #[cfg(not(any(feature = "sqlite", feature = "postgres")))]
        {
            false
        }
    }
}

// Conversion from BackendError to the main Error type
impl From<BackendError> for crate::Error {
    fn from(err: BackendError) -> Self {
        crate::Error::Backend(err)
    }
}
