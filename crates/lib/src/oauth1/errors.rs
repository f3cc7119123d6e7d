//! Error types for the OAuth1 handshake.

use thiserror::Error;

/// Errors that can occur while signing OAuth1 requests, talking to the
/// tracker's OAuth endpoints, or reading the callback.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Oauth1Error {
    /// The callback did not carry a required parameter.
    #[error("OAuth callback is missing parameter '{name}'")]
    MissingCallbackParameter {
        /// Name of the missing query parameter
        name: &'static str,
    },

    /// Producing the RSA-SHA1 signature failed.
    #[error("Failed to sign OAuth request: {reason}")]
    SigningFailed {
        /// Description of the signing failure
        reason: String,
    },

    /// The tracker's OAuth endpoint did not answer in time.
    #[error("OAuth request timed out: {url}")]
    Timeout {
        /// The endpoint that was called
        url: String,
    },

    /// The request to the tracker's OAuth endpoint could not be completed.
    #[error("OAuth request to {url} failed")]
    Request {
        /// The endpoint that was called
        url: String,
        /// The underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// The tracker refused the token request.
    #[error("OAuth endpoint {url} rejected the request with status {status}")]
    Rejected {
        /// The endpoint that was called
        url: String,
        /// The HTTP status code
        status: u16,
    },

    /// The token response could not be understood.
    #[error("Malformed OAuth response from {url}: {reason}")]
    MalformedResponse {
        /// The endpoint that was called
        url: String,
        /// What was wrong with the response
        reason: String,
    },
}

impl Oauth1Error {
    /// Check if this error came from the remote tracker or the network.
    pub fn is_upstream_error(&self) -> bool {
        matches!(
            self,
            Oauth1Error::Timeout { .. }
                | Oauth1Error::Request { .. }
                | Oauth1Error::Rejected { .. }
                | Oauth1Error::MalformedResponse { .. }
        )
    }

    /// Check if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Oauth1Error::Timeout { .. })
    }

    /// Check if this error means the inbound callback could not be parsed.
    pub fn is_malformed_callback(&self) -> bool {
        matches!(self, Oauth1Error::MissingCallbackParameter { .. })
    }

    pub(crate) fn from_send(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Oauth1Error::Timeout {
                url: url.to_string(),
            }
        } else {
            Oauth1Error::Request {
                url: url.to_string(),
                source,
            }
        }
    }
}

impl From<Oauth1Error> for crate::Error {
    fn from(err: Oauth1Error) -> Self {
        crate::Error::Oauth1(err)
    }
}
