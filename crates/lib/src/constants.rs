//! Constants used throughout the trackerlink library.
//!
//! Route paths, header names and storage key prefixes live here so the web
//! layer, the instances building callback URLs, and the stores agree on them.

use std::time::Duration;

/// Header injected by the host platform carrying the authenticated user id.
pub const HOST_USER_ID_HEADER: &str = "Mattermost-User-Id";

/// Route receiving the tracker's redirect back after the user approves access.
pub const ROUTE_OAUTH1_COMPLETE: &str = "/oauth1/complete";

/// Route serving the PEM public key for administrators.
pub const ROUTE_OAUTH1_PUBLIC_KEY: &str = "/oauth1/public_key";

/// Route starting the redirect-out half of the handshake.
pub const ROUTE_USER_CONNECT: &str = "/oauth1/connect";

/// Route removing the caller's link.
pub const ROUTE_USER_DISCONNECT: &str = "/user/disconnect";

/// Route returning the caller's connection status as JSON.
pub const ROUTE_USER_INFO: &str = "/api/v1/userinfo";

/// Route for liveness checks.
pub const ROUTE_HEALTH: &str = "/health";

/// Backend key holding the PKCS#8 PEM private key.
pub const RSA_KEY: &str = "rsa_key";

/// Backend key holding the persisted current instance configuration.
pub const CURRENT_INSTANCE: &str = "current_instance";

/// Prefix for one-time secret keys.
pub const ONE_TIME_SECRET_PREFIX: &str = "ots_";

/// Prefix for cloud connect token keys, kept apart from request tokens.
pub const CONNECT_TOKEN_PREFIX: &str = "ctk_";

/// Prefix for forward link keys (host user -> tracker user).
pub const HOST_USER_PREFIX: &str = "hostuser_";

/// Prefix for reverse link keys (tracker username -> host user).
pub const TRACKER_USER_PREFIX: &str = "trackeruser_";

/// How long a one-time secret remains loadable.
pub const DEFAULT_SECRET_TTL: Duration = Duration::from_secs(15 * 60);

/// Bound on every network call to the tracker.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// RSA modulus size for a freshly generated keypair.
pub const DEFAULT_KEY_BITS: usize = 2048;
