use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{OneTimeSecretStore, StoreError};
use crate::Result;
use crate::backend::Backend;
use crate::constants::{DEFAULT_SECRET_TTL, ONE_TIME_SECRET_PREFIX};

/// [`OneTimeSecretStore`] backed by a [`Backend`], with expiry.
///
/// Tokens are hashed before use as backend keys. Stores with different
/// prefixes never see each other's tokens.
#[derive(Clone, Debug)]
pub struct OneTimeSecrets {
    backend: Arc<dyn Backend>,
    ttl: Duration,
    prefix: &'static str,
}

impl OneTimeSecrets {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_ttl(backend, DEFAULT_SECRET_TTL)
    }

    pub fn with_ttl(backend: Arc<dyn Backend>, ttl: Duration) -> Self {
        Self {
            backend,
            ttl,
            prefix: ONE_TIME_SECRET_PREFIX,
        }
    }

    /// Replace the backend key prefix, giving this store its own namespace.
    pub fn with_prefix(mut self, prefix: &'static str) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key(&self, token: &str) -> String {
        let digest = Sha256::digest(token.as_bytes());
        format!("{}{}", self.prefix, hex::encode(digest))
    }
}

#[async_trait]
impl OneTimeSecretStore for OneTimeSecrets {
    async fn store(&self, token: &str, secret: &str) -> Result<()> {
        self.backend
            .set(&self.key(token), secret.to_string(), Some(self.ttl))
            .await
    }

    async fn load(&self, token: &str) -> Result<String> {
        self.backend
            .get(&self.key(token))
            .await?
            .ok_or_else(|| StoreError::SecretNotFound.into())
    }

    async fn delete(&self, token: &str) -> Result<()> {
        self.backend.delete(&self.key(token)).await
    }

    async fn consume(&self, token: &str) -> Result<String> {
        self.backend
            .take(&self.key(token))
            .await?
            .ok_or_else(|| StoreError::SecretNotFound.into())
    }
}
