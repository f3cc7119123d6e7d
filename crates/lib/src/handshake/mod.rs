//! The handshake orchestrator.
//!
//! [`HandshakeOrchestrator::complete`] finishes a three-legged OAuth1
//! handshake when the tracker redirects the user back. It walks through
//! [`HandshakeState`] in order and aborts at the first failure:
//!
//! 1. parse the callback for the request token and verifier;
//! 2. resolve the active instance;
//! 3. consume the one-time secret stored for the request token;
//! 4. identify the calling host user;
//! 5. exchange the request token for an access credential;
//! 6. fetch the tracker profile with the new credential;
//! 7. persist the link, keeping prior settings on a re-link;
//! 8. hand back a [`Confirmation`] to render.
//!
//! A consumed secret stays consumed whatever happens afterwards, so a
//! failed handshake is retried from the start with a fresh secret. There
//! is no retry inside a single callback.
//!
//! The orchestrator also drives the neighbouring user actions: starting a
//! connection, disconnecting, and reporting connection status.

use std::sync::Arc;

use handle_trait::Handle;
use serde::Serialize;
use url::Url;

use crate::clock::Clock;
use crate::constants::ROUTE_USER_DISCONNECT;
use crate::host::{HostApi, HostError, HostEvent, HostUser};
use crate::instance::{InstanceRegistry, InstanceType};
use crate::oauth1;
use crate::store::{OneTimeSecretStore, TrackerUser, UserLinkStore, UserSettings};
use crate::tracker::endpoint_url;
use crate::{Error, ErrorKind, Result};

/// Progress of one callback through the handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeState {
    CallbackReceived,
    InstanceResolved,
    SecretResolved,
    UserAuthenticated,
    TokenExchanged,
    ProfileFetched,
    LinkPersisted,
    Responded,
}

impl std::fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HandshakeState::CallbackReceived => "callback_received",
            HandshakeState::InstanceResolved => "instance_resolved",
            HandshakeState::SecretResolved => "secret_resolved",
            HandshakeState::UserAuthenticated => "user_authenticated",
            HandshakeState::TokenExchanged => "token_exchanged",
            HandshakeState::ProfileFetched => "profile_fetched",
            HandshakeState::LinkPersisted => "link_persisted",
            HandshakeState::Responded => "responded",
        };
        f.write_str(name)
    }
}

/// What the confirmation page shows after a successful handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Confirmation {
    pub host_display_name: String,
    /// Tracker display name with the username, e.g. `Jane Doe (jdoe)`.
    pub tracker_display: String,
    pub instance_url: Url,
    pub disconnect_url: Url,
}

/// What the page shows after a link is removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Disconnection {
    pub host_display_name: String,
    pub tracker_display: String,
    pub instance_url: Url,
}

/// Connection status of a host user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub is_connected: bool,
    pub instance_type: Option<InstanceType>,
    pub instance_url: Option<String>,
    pub tracker_username: Option<String>,
    pub tracker_display_name: Option<String>,
    pub settings: Option<UserSettings>,
}

/// Coordinates the stores, the active instance and the host platform.
///
/// This is a cheap-to-clone handle.
#[derive(Clone, Debug, Handle)]
pub struct HandshakeOrchestrator {
    inner: Arc<OrchestratorInner>,
}

#[derive(Debug)]
struct OrchestratorInner {
    registry: Arc<dyn InstanceRegistry>,
    secrets: Arc<dyn OneTimeSecretStore>,
    links: Arc<dyn UserLinkStore>,
    host: Arc<dyn HostApi>,
    clock: Arc<dyn Clock>,
    disconnect_url: Url,
}

impl HandshakeOrchestrator {
    /// Creates an orchestrator.
    ///
    /// `public_url` is this service's externally reachable base URL. `clock`
    /// stamps each new link.
    pub fn new(
        registry: Arc<dyn InstanceRegistry>,
        secrets: Arc<dyn OneTimeSecretStore>,
        links: Arc<dyn UserLinkStore>,
        host: Arc<dyn HostApi>,
        clock: Arc<dyn Clock>,
        public_url: &Url,
    ) -> Result<Self> {
        let disconnect_url = endpoint_url(public_url, ROUTE_USER_DISCONNECT).map_err(|e| {
            crate::instance::InstanceError::InvalidUrl {
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            inner: Arc::new(OrchestratorInner {
                registry,
                secrets,
                links,
                host,
                clock,
                disconnect_url,
            }),
        })
    }

    /// Completes a handshake from the tracker's callback.
    ///
    /// `host_user_id` is the identity from the trusted request header and
    /// `callback_query` the raw query string of the callback.
    pub async fn complete(
        &self,
        host_user_id: Option<&str>,
        callback_query: &str,
    ) -> Result<Confirmation> {
        let mut state = HandshakeState::CallbackReceived;
        tracing::debug!(%state, "Handshake callback received");

        let result = self
            .run_completion(host_user_id, callback_query, &mut state)
            .await;
        if let Err(err) = &result {
            log_failure(state, host_user_id, err);
        }
        result
    }

    async fn run_completion(
        &self,
        host_user_id: Option<&str>,
        callback_query: &str,
        state: &mut HandshakeState,
    ) -> Result<Confirmation> {
        let callback = oauth1::parse_callback(callback_query)?;

        let instance = self.inner.registry.current().await?;
        advance(state, HandshakeState::InstanceResolved);

        let request_secret = self.inner.secrets.consume(&callback.token).await?;
        advance(state, HandshakeState::SecretResolved);

        let (host_user_id, host_user) = self.authenticate(host_user_id).await?;
        advance(state, HandshakeState::UserAuthenticated);

        let credential = instance
            .exchange_token(&callback.token, &request_secret, &callback.verifier)
            .await?;
        advance(state, HandshakeState::TokenExchanged);

        let profile = instance
            .build_client_for(&credential)
            .await?
            .get_self()
            .await?;
        advance(state, HandshakeState::ProfileFetched);

        let settings = match self
            .inner
            .links
            .load_by_host_user(&instance, host_user_id)
            .await
        {
            Ok(previous) => previous.settings,
            Err(err) if err.is_not_found() => UserSettings::default(),
            Err(err) => return Err(err),
        };
        let user = TrackerUser {
            profile,
            credential,
            settings,
            connected_at: self.inner.clock.now_rfc3339(),
        };
        self.inner
            .links
            .store(&instance, host_user_id, &user)
            .await?;
        advance(state, HandshakeState::LinkPersisted);

        tracing::info!(
            instance = instance.storage_key(),
            host_user_id,
            tracker_username = user.username(),
            "Linked tracker user"
        );
        self.publish(
            host_user_id,
            HostEvent::Connected {
                instance: instance.storage_key().to_string(),
                tracker_username: user.username().to_string(),
                tracker_display_name: user.display_name().to_string(),
            },
        )
        .await;

        let confirmation = Confirmation {
            host_display_name: host_user.display_name(),
            tracker_display: user.profile.label(),
            instance_url: instance.url().clone(),
            disconnect_url: self.inner.disconnect_url.clone(),
        };
        advance(state, HandshakeState::Responded);
        Ok(confirmation)
    }

    /// Starts connecting the caller and returns where to redirect them.
    pub async fn begin(&self, host_user_id: Option<&str>) -> Result<Url> {
        let (host_user_id, _) = self.authenticate(host_user_id).await?;
        let instance = self.inner.registry.current().await?;
        let url = instance.begin_user_connect(host_user_id).await?;
        tracing::debug!(
            instance = instance.storage_key(),
            host_user_id,
            "Started user connect"
        );
        Ok(url)
    }

    /// Removes the caller's link on the active instance.
    ///
    /// Fails with a not-found error if the caller is not connected.
    pub async fn disconnect(&self, host_user_id: Option<&str>) -> Result<Disconnection> {
        let (host_user_id, host_user) = self.authenticate(host_user_id).await?;
        let instance = self.inner.registry.current().await?;
        let user = self
            .inner
            .links
            .load_by_host_user(&instance, host_user_id)
            .await?;

        self.inner.links.delete(&instance, host_user_id).await?;
        tracing::info!(
            instance = instance.storage_key(),
            host_user_id,
            tracker_username = user.username(),
            "Unlinked tracker user"
        );
        self.publish(
            host_user_id,
            HostEvent::Disconnected {
                instance: instance.storage_key().to_string(),
            },
        )
        .await;

        Ok(Disconnection {
            host_display_name: host_user.display_name(),
            tracker_display: user.profile.label(),
            instance_url: instance.url().clone(),
        })
    }

    /// Reports the caller's connection status.
    ///
    /// With no instance configured the caller is reported as not connected.
    pub async fn user_info(&self, host_user_id: Option<&str>) -> Result<UserInfo> {
        let host_user_id = require_identity(host_user_id)?;
        let instance = match self.inner.registry.current().await {
            Ok(instance) => instance,
            Err(err) if err.is_not_configured() => return Ok(UserInfo::default()),
            Err(err) => return Err(err),
        };

        let mut info = UserInfo {
            instance_type: Some(instance.instance_type()),
            instance_url: Some(instance.url().to_string()),
            ..Default::default()
        };
        match self
            .inner
            .links
            .load_by_host_user(&instance, host_user_id)
            .await
        {
            Ok(user) => {
                info.is_connected = true;
                info.tracker_username = Some(user.username().to_string());
                info.tracker_display_name = Some(user.display_name().to_string());
                info.settings = Some(user.settings.clone());
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }
        Ok(info)
    }

    async fn authenticate<'a>(&self, host_user_id: Option<&'a str>) -> Result<(&'a str, HostUser)> {
        let host_user_id = require_identity(host_user_id)?;
        let host_user = self.inner.host.get_user(host_user_id).await?;
        Ok((host_user_id, host_user))
    }

    async fn publish(&self, host_user_id: &str, event: HostEvent) {
        if let Err(err) = self.inner.host.publish_event(host_user_id, event).await {
            tracing::warn!(host_user_id, error = %err, "Failed to publish host event");
        }
    }
}

fn require_identity(host_user_id: Option<&str>) -> Result<&str> {
    host_user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| HostError::MissingIdentity.into())
}

fn advance(state: &mut HandshakeState, next: HandshakeState) {
    tracing::debug!(from = %state, to = %next, "Handshake state transition");
    *state = next;
}

fn log_failure(state: HandshakeState, host_user_id: Option<&str>, err: &Error) {
    match err.kind() {
        ErrorKind::InternalFailure => {
            tracing::error!(%state, host_user_id, error = %err, "Handshake failed")
        }
        kind => tracing::warn!(%state, host_user_id, ?kind, error = %err, "Handshake failed"),
    }
}
