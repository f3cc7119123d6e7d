//! In-memory backend implementation
//!
//! This module provides an in-memory implementation of the `Backend` trait,
//! suitable for testing, development, or single-node deployments where the
//! state is saved to a JSON file on shutdown.

mod persistence;

use std::any::Any;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Result;
use crate::backend::Backend;
use crate::clock::{Clock, SystemClock};

/// A stored value with its optional absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoredValue {
    pub(crate) value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) expires_at: Option<u64>,
}

/// A simple in-memory backend using a `HashMap` for storage.
///
/// It provides basic persistence via `save_to_file` and `load_from_file`,
/// serializing the map to JSON. Expired values are dropped lazily: they are
/// invisible to reads and are skipped when saving.
///
/// **Security Note**: The RSA private key and OAuth credentials are held in
/// memory and written to the persistence file in plaintext. Protect the data
/// directory accordingly.
#[derive(Debug)]
pub struct InMemory {
    pub(crate) entries: RwLock<HashMap<String, StoredValue>>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl InMemory {
    /// Creates a new, empty `InMemory` backend using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a new, empty `InMemory` backend using the given clock for expiry.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Returns all live keys currently stored.
    pub async fn keys(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|(_, stored)| self.is_live(stored))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Saves the backend state to a specified file as JSON.
    ///
    /// # Arguments
    /// * `path` - The path to the file where the state should be saved.
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persistence::save_to_file(self, path).await
    }

    /// Loads the backend state from a specified JSON file.
    ///
    /// If the file does not exist, a new, empty `InMemory` backend is returned.
    ///
    /// # Arguments
    /// * `path` - The path to the file from which to load the state.
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        persistence::load_from_file(path, Arc::new(SystemClock)).await
    }

    fn is_live(&self, stored: &StoredValue) -> bool {
        match stored.expires_at {
            Some(expires_at) => !self.clock.is_expired(expires_at),
            None => true,
        }
    }

    fn stored(&self, value: String, ttl: Option<Duration>) -> StoredValue {
        StoredValue {
            value,
            expires_at: ttl.map(|ttl| self.clock.expiry_after(ttl)),
        }
    }
}

impl Default for InMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for InMemory {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|stored| self.is_live(stored))
            .map(|stored| stored.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let stored = self.stored(value, ttl);
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), stored);
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let stored = self.stored(value, ttl);
        // Check and insert under one write guard.
        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.get(key)
            && self.is_live(existing)
        {
            return Ok(false);
        }
        entries.insert(key.to_string(), stored);
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.write().await;
        Ok(entries
            .remove(key)
            .filter(|stored| self.is_live(stored))
            .map(|stored| stored.value))
    }

    fn kind_name(&self) -> &'static str {
        "inmemory"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
