//! Error types for the key store.

use thiserror::Error;

/// Errors that can occur while creating, loading or encoding the keypair.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum KeyError {
    /// RSA key generation failed.
    #[error("Failed to generate RSA keypair: {reason}")]
    GenerationFailed {
        /// Description of the failure
        reason: String,
    },

    /// A key could not be encoded to PEM.
    #[error("Failed to encode key: {reason}")]
    EncodingFailed {
        /// Description of the failure
        reason: String,
    },

    /// The stored private key could not be decoded.
    #[error("Failed to decode stored private key: {reason}")]
    DecodingFailed {
        /// Description of the failure
        reason: String,
    },

    /// The background generation task did not complete.
    #[error("Key generation task failed: {reason}")]
    TaskFailed {
        /// Description of the failure
        reason: String,
    },

    /// Another writer won the creation race but its key could not be read back.
    #[error("Keypair vanished after a concurrent write")]
    LostRace,
}

impl KeyError {
    /// Check if this error concerns stored key material that is unusable.
    pub fn is_corrupted(&self) -> bool {
        matches!(self, KeyError::DecodingFailed { .. })
    }
}

impl From<KeyError> for crate::Error {
    fn from(err: KeyError) -> Self {
        crate::Error::Key(err)
    }
}
