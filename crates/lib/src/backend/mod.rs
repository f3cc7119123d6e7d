//! Storage backends for trackerlink
//!
//! This module provides the `Backend` trait and its implementations. The
//! one-time secret store, the user link store, the key store and the instance
//! registry all persist through a `Backend`, so the storage mechanism can be
//! swapped without touching any of them.
//!
//! The contract is a string key-value map with optional per-value expiry and
//! two atomic primitives. [`Backend::set_if_absent`] lets the key store
//! guarantee that concurrent first use settles on a single keypair, and
//! [`Backend::take`] lets a one-time secret be handed out at most once.

use std::any::Any;
use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

pub mod database;
pub mod errors;

pub use database::InMemory;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub use database::{DbKind, SqlxBackend};
pub use errors::BackendError;

/// Key-value storage underneath every trackerlink store.
///
/// All implementations must be `Send` and `Sync` to allow sharing across
/// request handlers, and implement `Any` to allow for downcasting (the server
/// binary uses this to persist an `InMemory` backend on shutdown).
///
/// Each call is independently atomic. There are no multi-key transactions.
#[async_trait]
pub trait Backend: Send + Sync + Any + std::fmt::Debug {
    /// Retrieves the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key is absent or its expiry has passed.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// With `ttl` set, the value stops being visible once the TTL elapses.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;

    /// Stores `value` under `key` only if no live value exists.
    ///
    /// Returns `true` if this call created the value, `false` if another
    /// value was already present. Implementations must make the check and
    /// the write a single atomic step.
    async fn set_if_absent(&self, key: &str, value: String, ttl: Option<Duration>)
    -> Result<bool>;

    /// Removes `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Removes `key` and returns its live value, as one atomic step.
    ///
    /// Of any number of concurrent calls for the same key, at most one
    /// returns `Some`. An expired value is never returned.
    async fn take(&self, key: &str) -> Result<Option<String>>;

    /// Short name of this backend for health reporting.
    fn kind_name(&self) -> &'static str;

    /// Returns a reference to the backend instance as a dynamic `Any` type.
    fn as_any(&self) -> &dyn Any;
}
