//! Store contracts for the handshake.
//!
//! Two stores bridge the pieces of the OAuth flow:
//!
//! - [`OneTimeSecretStore`]: ephemeral values keyed by a request token that
//!   connect the redirect-out and callback-in halves of a handshake. The
//!   provided [`OneTimeSecretStore::consume`] reads and removes a secret in one
//!   call, so a secret can be used at most once.
//! - [`UserLinkStore`]: the host user ↔ tracker user links, partitioned per
//!   instance and indexed in both directions.
//!
//! [`OneTimeSecrets`] and [`UserLinks`] implement the contracts on top of any
//! [`Backend`](crate::backend::Backend).

mod errors;
mod links;
mod secrets;
mod types;

use async_trait::async_trait;

pub use errors::StoreError;
pub use links::UserLinks;
pub use secrets::OneTimeSecrets;
pub use types::{SettingValue, TrackerUser, UserSettings};

use crate::Result;
use crate::instance::Instance;

/// Single-use secrets keyed by an opaque token.
#[async_trait]
pub trait OneTimeSecretStore: Send + Sync + std::fmt::Debug {
    /// Stores `secret` under `token`, replacing any previous value.
    async fn store(&self, token: &str, secret: &str) -> Result<()>;

    /// Loads the secret for `token`.
    ///
    /// Fails with [`StoreError::SecretNotFound`] if there is none or it expired.
    async fn load(&self, token: &str) -> Result<String>;

    /// Removes the secret for `token`. Removing an absent token succeeds.
    async fn delete(&self, token: &str) -> Result<()>;

    /// Loads the secret for `token` and then deletes it unconditionally.
    ///
    /// Once the load succeeds the secret counts as consumed: a failing delete
    /// is reported as [`StoreError::SecretDeleteFailed`] and the secret is
    /// not handed out.
    ///
    /// This default is two separate calls. Stores that can remove and read in
    /// one atomic step must override it so concurrent callers cannot both
    /// receive the secret.
    async fn consume(&self, token: &str) -> Result<String> {
        let secret = self.load(token).await?;
        if let Err(err) = self.delete(token).await {
            tracing::error!(error = %err, "Failed to delete consumed one-time secret");
            return Err(StoreError::SecretDeleteFailed {
                reason: err.to_string(),
            }
            .into());
        }
        Ok(secret)
    }
}

/// Links between host users and tracker users, scoped per instance.
#[async_trait]
pub trait UserLinkStore: Send + Sync + std::fmt::Debug {
    /// Stores the link for `(instance, host_user_id)`, replacing any prior one.
    async fn store(&self, instance: &Instance, host_user_id: &str, user: &TrackerUser)
    -> Result<()>;

    /// Loads the tracker user linked to `host_user_id`.
    async fn load_by_host_user(&self, instance: &Instance, host_user_id: &str)
    -> Result<TrackerUser>;

    /// Loads the host user id linked to `tracker_username`.
    async fn load_host_user_by_tracker_username(
        &self,
        instance: &Instance,
        tracker_username: &str,
    ) -> Result<String>;

    /// Removes the link for `host_user_id`. Removing an absent link succeeds.
    async fn delete(&self, instance: &Instance, host_user_id: &str) -> Result<()>;
}
