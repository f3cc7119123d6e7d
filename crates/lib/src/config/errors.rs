//! Error types for loading the service configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or validating the service config file.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON for [`super::Config`].
    #[error("Failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A value is out of range or inconsistent.
    #[error("Invalid config: {reason}")]
    Invalid {
        /// What was wrong
        reason: String,
    },
}

impl ConfigError {
    /// Check if the file could not be read.
    pub fn is_read_error(&self) -> bool {
        matches!(self, ConfigError::Read { .. })
    }

    /// Check if the file contents could not be parsed.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, ConfigError::Parse { .. })
    }

    /// Check if a value failed validation.
    pub fn is_invalid(&self) -> bool {
        matches!(self, ConfigError::Invalid { .. })
    }
}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::Config(err)
    }
}
