//! Error types for the host platform collaborator.

use thiserror::Error;

use super::Permission;

/// Errors raised while identifying or authorizing a host user.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HostError {
    /// The request carried no trusted user identity.
    #[error("Request carries no host user identity")]
    MissingIdentity,

    /// The identity does not name a known host user.
    #[error("Host user not found: {user_id}")]
    UserNotFound {
        /// The id that was looked up
        user_id: String,
    },

    /// The user lacks a required permission.
    #[error("Host user {user_id} lacks permission {permission}")]
    PermissionDenied {
        /// The user that was checked
        user_id: String,
        /// The permission that was required
        permission: Permission,
    },

    /// The host platform API failed.
    #[error("Host API call failed: {reason}")]
    Api {
        /// Description of the failure
        reason: String,
    },
}

impl HostError {
    /// Check if this error means the caller could not be identified.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            HostError::MissingIdentity | HostError::UserNotFound { .. }
        )
    }

    /// Check if this error means the caller lacks a permission.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, HostError::PermissionDenied { .. })
    }
}

impl From<HostError> for crate::Error {
    fn from(err: HostError) -> Self {
        crate::Error::Host(err)
    }
}
