//!
//! trackerlink: connects users of a host collaboration platform to their
//! accounts on an external issue tracker.
//!
//! ## Core Concepts
//!
//! * **Instances (`instance::Instance`)**: One configured tracker deployment. The
//!   self-hosted `Server` variant and the vendor-hosted `Cloud` variant expose the
//!   same capability set, so orchestration code never branches on the variant.
//! * **Registry (`instance::InstanceRegistry`)**: Resolves the currently active
//!   instance from explicit configuration.
//! * **Stores (`store`)**: Contracts for one-time secrets that bridge the two
//!   halves of the handshake, and for the host-user ↔ tracker-user links.
//! * **KeyStore (`keys::KeyStore`)**: The RSA keypair a tracker deployment trusts
//!   to verify requests signed by this service. Created once, first writer wins.
//! * **Backends (`backend::Backend`)**: Pluggable key-value storage underneath
//!   the stores, with an atomic create-if-absent primitive.
//! * **Handshake (`handshake::HandshakeOrchestrator`)**: Completes the
//!   three-legged OAuth1 flow and persists the resulting link.
//! * **Web (`web`)**: The axum router exposing the callback, public key,
//!   connect, disconnect and user info endpoints.

pub mod backend;
pub mod clock;
pub mod config;
pub mod constants;
pub mod handshake;
pub mod host;
pub mod instance;
pub mod keys;
pub mod oauth1;
pub mod store;
pub mod tracker;
pub mod web;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;
pub use config::Config;
pub use handshake::HandshakeOrchestrator;
pub use instance::{Instance, InstanceRegistry};
pub use keys::KeyStore;

/// Result type used throughout the trackerlink library.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure classes reported to callers of the HTTP endpoints.
///
/// Every [`Error`] maps to exactly one kind; the web layer turns the kind into
/// a status code and a short message, never the error's own text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No tracker instance is configured yet.
    NotConfigured,
    /// The caller's identity is missing or unknown.
    Unauthorized,
    /// The caller lacks a required permission.
    Forbidden,
    /// A one-time secret or link record does not exist.
    NotFound,
    /// The tracker rejected the request or did not answer in time.
    UpstreamExchangeFailure,
    /// The request itself could not be understood.
    InvalidRequest,
    /// Encoding, storage or rendering faults on this side.
    InternalFailure,
}

impl ErrorKind {
    /// Short, fixed message safe to put in a response body.
    pub fn public_message(&self) -> &'static str {
        match self {
            ErrorKind::NotConfigured => "tracker instance is not configured",
            ErrorKind::Unauthorized => "not authorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not found",
            ErrorKind::UpstreamExchangeFailure => "tracker request failed",
            ErrorKind::InvalidRequest => "invalid request",
            ErrorKind::InternalFailure => "internal error",
        }
    }
}

/// Common error type for the trackerlink library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured storage errors from the backend module
    #[error(transparent)]
    Backend(backend::BackendError),

    /// Structured errors from the one-time secret and link stores
    #[error(transparent)]
    Store(store::StoreError),

    /// Structured keypair errors from the keys module
    #[error(transparent)]
    Key(keys::KeyError),

    /// Structured OAuth1 protocol errors
    #[error(transparent)]
    Oauth1(oauth1::Oauth1Error),

    /// Structured errors from tracker REST calls
    #[error(transparent)]
    Tracker(tracker::TrackerError),

    /// Structured instance resolution and capability errors
    #[error(transparent)]
    Instance(instance::InstanceError),

    /// Structured host collaborator errors
    #[error(transparent)]
    Host(host::HostError),

    /// Structured configuration errors
    #[error(transparent)]
    Config(config::ConfigError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
            Error::Backend(_) => "backend",
            Error::Store(_) => "store",
            Error::Key(_) => "keys",
            Error::Oauth1(_) => "oauth1",
            Error::Tracker(_) => "tracker",
            Error::Instance(_) => "instance",
            Error::Host(_) => "host",
            Error::Config(_) => "config",
        }
    }

    /// Classify this error into the kind reported to callers.
    pub fn kind(&self) -> ErrorKind {
        if self.is_not_configured() {
            ErrorKind::NotConfigured
        } else if self.is_unauthorized() {
            ErrorKind::Unauthorized
        } else if self.is_forbidden() {
            ErrorKind::Forbidden
        } else if self.is_not_found() {
            ErrorKind::NotFound
        } else if self.is_upstream_error() {
            ErrorKind::UpstreamExchangeFailure
        } else if self.is_invalid_request() {
            ErrorKind::InvalidRequest
        } else {
            ErrorKind::InternalFailure
        }
    }

    /// Check if this error means no tracker instance is configured.
    pub fn is_not_configured(&self) -> bool {
        match self {
            Error::Instance(instance_err) => instance_err.is_not_configured(),
            _ => false,
        }
    }

    /// Check if this error indicates a missing or unknown caller identity.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Error::Host(host_err) => host_err.is_unauthorized(),
            _ => false,
        }
    }

    /// Check if this error indicates the caller lacks permission.
    pub fn is_forbidden(&self) -> bool {
        match self {
            Error::Host(host_err) => host_err.is_forbidden(),
            _ => false,
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error came from talking to the remote tracker.
    pub fn is_upstream_error(&self) -> bool {
        match self {
            Error::Oauth1(oauth_err) => oauth_err.is_upstream_error(),
            Error::Tracker(_) => true,
            _ => false,
        }
    }

    /// Check if this error is a timeout talking to the remote tracker.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Oauth1(oauth_err) => oauth_err.is_timeout(),
            Error::Tracker(tracker_err) => tracker_err.is_timeout(),
            _ => false,
        }
    }

    /// Check if this error was caused by a malformed inbound request.
    pub fn is_invalid_request(&self) -> bool {
        match self {
            Error::Oauth1(oauth_err) => oauth_err.is_malformed_callback(),
            _ => false,
        }
    }

    /// Check if this error is storage-related.
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Backend(_))
            || matches!(self, Error::Store(store_err) if !store_err.is_not_found())
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Backend(backend_err) => backend_err.is_io_error(),
            _ => false,
        }
    }
}
