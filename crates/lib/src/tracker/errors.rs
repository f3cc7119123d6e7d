//! Error types for calls against the tracker's REST API.

use thiserror::Error;

/// Errors that can occur while talking to a tracker deployment's REST API.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The tracker did not answer within the configured timeout.
    #[error("Tracker request timed out: {url}")]
    Timeout {
        /// The URL that was requested
        url: String,
    },

    /// The request could not be sent or the connection failed.
    #[error("Tracker request to {url} failed")]
    Request {
        /// The URL that was requested
        url: String,
        /// The underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// The tracker answered with a non-success status.
    #[error("Tracker returned status {status} for {url}")]
    Status {
        /// The URL that was requested
        url: String,
        /// The HTTP status code
        status: u16,
    },

    /// The response body could not be decoded.
    #[error("Failed to decode tracker response from {url}")]
    Decode {
        /// The URL that was requested
        url: String,
        /// The underlying decoding error
        #[source]
        source: reqwest::Error,
    },

    /// A request URL could not be built from the instance URL.
    #[error("Invalid tracker URL: {reason}")]
    InvalidUrl {
        /// Description of the problem
        reason: String,
    },
}

impl TrackerError {
    /// Check if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TrackerError::Timeout { .. })
    }

    /// Check if the tracker rejected the caller's credential.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, TrackerError::Status { status, .. } if *status == 401 || *status == 403)
    }

    /// Wrap a `reqwest` send error, separating out timeouts.
    pub(crate) fn from_send(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            TrackerError::Timeout {
                url: url.to_string(),
            }
        } else {
            TrackerError::Request {
                url: url.to_string(),
                source,
            }
        }
    }
}

impl From<TrackerError> for crate::Error {
    fn from(err: TrackerError) -> Self {
        crate::Error::Tracker(err)
    }
}
