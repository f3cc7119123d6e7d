use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{StoreError, TrackerUser, UserLinkStore};
use crate::Result;
use crate::backend::Backend;
use crate::constants::{HOST_USER_PREFIX, TRACKER_USER_PREFIX};
use crate::instance::Instance;

/// [`UserLinkStore`] backed by a [`Backend`].
///
/// Each link is written as two records: the serialized [`TrackerUser`] under
/// a key derived from the host user id, and the host user id under a key
/// derived from the tracker username. Both keys hash in the instance's
/// storage key, so links never leak between instances.
#[derive(Clone, Debug)]
pub struct UserLinks {
    backend: Arc<dyn Backend>,
}

impl UserLinks {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    fn hashed_key(prefix: &str, instance: &Instance, id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(instance.storage_key().as_bytes());
        hasher.update([0u8]);
        hasher.update(id.as_bytes());
        format!("{prefix}{}", hex::encode(hasher.finalize()))
    }

    fn host_key(instance: &Instance, host_user_id: &str) -> String {
        Self::hashed_key(HOST_USER_PREFIX, instance, host_user_id)
    }

    fn tracker_key(instance: &Instance, tracker_username: &str) -> String {
        Self::hashed_key(TRACKER_USER_PREFIX, instance, tracker_username)
    }

    async fn load_record(&self, key: &str) -> Result<Option<TrackerUser>> {
        match self.backend.get(key).await? {
            Some(json) => {
                let user = serde_json::from_str(&json).map_err(|e| StoreError::CorruptedRecord {
                    key: key.to_string(),
                    source: e,
                })?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Removes the reverse record for `tracker_username` if it still points
    /// at `host_user_id`.
    async fn drop_reverse(
        &self,
        instance: &Instance,
        tracker_username: &str,
        host_user_id: &str,
    ) -> Result<()> {
        let key = Self::tracker_key(instance, tracker_username);
        if self.backend.get(&key).await?.as_deref() == Some(host_user_id) {
            self.backend.delete(&key).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl UserLinkStore for UserLinks {
    async fn store(
        &self,
        instance: &Instance,
        host_user_id: &str,
        user: &TrackerUser,
    ) -> Result<()> {
        let host_key = Self::host_key(instance, host_user_id);
        let json = serde_json::to_string(user)?;

        if let Some(previous) = self.load_record(&host_key).await?
            && previous.username() != user.username()
        {
            self.drop_reverse(instance, previous.username(), host_user_id)
                .await?;
        }

        // Reverse first, so a stored forward record always has its reverse entry.
        let tracker_key = Self::tracker_key(instance, user.username());
        let previous_reverse = self.backend.get(&tracker_key).await?;
        self.backend
            .set(&tracker_key, host_user_id.to_string(), None)
            .await?;
        if let Err(err) = self.backend.set(&host_key, json, None).await {
            let restored = match previous_reverse {
                Some(previous) => self.backend.set(&tracker_key, previous, None).await,
                None => self.backend.delete(&tracker_key).await,
            };
            if let Err(cleanup) = restored {
                tracing::error!(
                    instance = instance.storage_key(),
                    host_user_id,
                    error = %cleanup,
                    "Failed to roll back reverse link record"
                );
            }
            return Err(err);
        }

        tracing::debug!(
            instance = instance.storage_key(),
            host_user_id,
            "Stored user link"
        );
        Ok(())
    }

    async fn load_by_host_user(
        &self,
        instance: &Instance,
        host_user_id: &str,
    ) -> Result<TrackerUser> {
        self.load_record(&Self::host_key(instance, host_user_id))
            .await?
            .ok_or_else(|| {
                StoreError::LinkNotFound {
                    host_user_id: host_user_id.to_string(),
                    instance: instance.storage_key().to_string(),
                }
                .into()
            })
    }

    async fn load_host_user_by_tracker_username(
        &self,
        instance: &Instance,
        tracker_username: &str,
    ) -> Result<String> {
        self.backend
            .get(&Self::tracker_key(instance, tracker_username))
            .await?
            .ok_or_else(|| {
                StoreError::TrackerUserNotFound {
                    tracker_username: tracker_username.to_string(),
                    instance: instance.storage_key().to_string(),
                }
                .into()
            })
    }

    async fn delete(&self, instance: &Instance, host_user_id: &str) -> Result<()> {
        let host_key = Self::host_key(instance, host_user_id);
        if let Some(previous) = self.load_record(&host_key).await? {
            self.drop_reverse(instance, previous.username(), host_user_id)
                .await?;
        }
        self.backend.delete(&host_key).await?;

        tracing::debug!(
            instance = instance.storage_key(),
            host_user_id,
            "Deleted user link"
        );
        Ok(())
    }
}
