//! Error types for the one-time secret and user link stores.

use thiserror::Error;

/// Errors that can occur in the one-time secret and user link stores.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// No live one-time secret exists for the token.
    #[error("One-time secret not found")]
    SecretNotFound,

    /// A secret was read but could not be removed afterwards.
    ///
    /// The secret still counts as consumed.
    #[error("Failed to delete consumed one-time secret: {reason}")]
    SecretDeleteFailed {
        /// Description of the delete failure
        reason: String,
    },

    /// No link exists for the host user on this instance.
    #[error("No tracker user linked to host user '{host_user_id}' on instance '{instance}'")]
    LinkNotFound {
        /// The host user that was looked up
        host_user_id: String,
        /// Storage key of the instance
        instance: String,
    },

    /// No host user is linked to the tracker username on this instance.
    #[error("No host user linked to tracker user '{tracker_username}' on instance '{instance}'")]
    TrackerUserNotFound {
        /// The tracker username that was looked up
        tracker_username: String,
        /// Storage key of the instance
        instance: String,
    },

    /// A stored record could not be decoded.
    #[error("Corrupted link record for '{key}'")]
    CorruptedRecord {
        /// Backend key of the record
        key: String,
        /// The underlying decoding error
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Check if this error indicates a secret or link was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::SecretNotFound
                | StoreError::LinkNotFound { .. }
                | StoreError::TrackerUserNotFound { .. }
        )
    }

    /// Check if this error concerns a one-time secret.
    pub fn is_secret_error(&self) -> bool {
        matches!(
            self,
            StoreError::SecretNotFound | StoreError::SecretDeleteFailed { .. }
        )
    }
}

impl From<StoreError> for crate::Error {
    fn from(err: StoreError) -> Self {
        crate::Error::Store(err)
    }
}
