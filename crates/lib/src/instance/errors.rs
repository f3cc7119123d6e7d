//! Error types for instance resolution and instance capabilities.

use thiserror::Error;

/// Errors that can occur while resolving or using a tracker instance.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum InstanceError {
    /// No tracker instance has been configured.
    #[error("No tracker instance is configured")]
    NotConfigured,

    /// The instance variant cannot use the supplied credential shape.
    #[error("{instance_type} instances do not accept {credential} credentials")]
    UnsupportedCredential {
        /// Variant tag of the instance
        instance_type: &'static str,
        /// Shape of the rejected credential
        credential: &'static str,
    },

    /// The instance variant does not implement the requested operation.
    #[error("{instance_type} instances do not support {operation}")]
    UnsupportedOperation {
        /// Variant tag of the instance
        instance_type: &'static str,
        /// Name of the operation
        operation: &'static str,
    },

    /// A URL derived from the instance URL is invalid.
    #[error("Invalid instance URL: {reason}")]
    InvalidUrl {
        /// Description of the problem
        reason: String,
    },

    /// The instance configuration is unusable.
    #[error("Invalid instance configuration: {reason}")]
    InvalidConfiguration {
        /// Description of the problem
        reason: String,
    },
}

impl InstanceError {
    /// Check if this error means no instance is configured yet.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, InstanceError::NotConfigured)
    }

    /// Check if this error is a capability mismatch of the instance variant.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            InstanceError::UnsupportedCredential { .. } | InstanceError::UnsupportedOperation { .. }
        )
    }
}

impl From<InstanceError> for crate::Error {
    fn from(err: InstanceError) -> Self {
        crate::Error::Instance(err)
    }
}
