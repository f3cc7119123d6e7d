//! Tracker instances.
//!
//! An [`Instance`] is one configured tracker deployment. Deployments come in
//! two variants with different authentication mechanics:
//!
//! - [`ServerInstance`]: self-hosted, three-legged OAuth1 with RSA-SHA1
//!   signed requests.
//! - [`CloudInstance`]: vendor-hosted, connected through an installed app and
//!   called with bearer tokens.
//!
//! Both implement [`InstanceCapabilities`], and [`Instance`] dispatches to
//! whichever variant it holds, so the handshake and the web layer never
//! branch on the variant. Adding a deployment variant means adding one
//! `Instance` arm and one `InstanceCapabilities` implementation.
//!
//! Instances are resolved through an [`InstanceRegistry`] on every use and
//! are never mutated; changing the configuration replaces the stored
//! [`InstanceConfig`].

mod cloud;
mod errors;
mod registry;
mod server;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use handle_trait::Handle;
use serde::{Deserialize, Serialize};
use url::Url;

pub use cloud::{CloudConfig, CloudInstance};
pub use errors::InstanceError;
pub use registry::{ConfiguredRegistry, InstanceRegistry};
pub use server::{DEFAULT_CONSUMER_KEY, ServerConfig, ServerInstance};

use crate::Result;
use crate::constants::ROUTE_OAUTH1_COMPLETE;
use crate::keys::KeyStore;
use crate::store::OneTimeSecretStore;
use crate::tracker::{Credential, TrackerClient, endpoint_url};

/// Variant tag of an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceType {
    Server,
    Cloud,
}

impl InstanceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceType::Server => "server",
            InstanceType::Cloud => "cloud",
        }
    }
}

impl std::fmt::Display for InstanceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted configuration of the active instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstanceConfig {
    Server(ServerConfig),
    Cloud(CloudConfig),
}

impl InstanceConfig {
    pub fn instance_type(&self) -> InstanceType {
        match self {
            InstanceConfig::Server(_) => InstanceType::Server,
            InstanceConfig::Cloud(_) => InstanceType::Cloud,
        }
    }

    pub fn storage_key(&self) -> &str {
        match self {
            InstanceConfig::Server(config) => &config.key,
            InstanceConfig::Cloud(config) => &config.key,
        }
    }

    /// Checks the fields both variants need.
    pub fn validate(&self) -> Result<()> {
        let (key, url) = match self {
            InstanceConfig::Server(config) => (&config.key, &config.url),
            InstanceConfig::Cloud(config) => {
                if config.app_key.trim().is_empty() {
                    return Err(InstanceError::InvalidConfiguration {
                        reason: "cloud instance requires an app_key".to_string(),
                    }
                    .into());
                }
                (&config.key, &config.url)
            }
        };

        if key.trim().is_empty() {
            return Err(InstanceError::InvalidConfiguration {
                reason: "instance key must not be empty".to_string(),
            }
            .into());
        }
        if !matches!(url.scheme(), "http" | "https") {
            return Err(InstanceError::InvalidConfiguration {
                reason: format!("unsupported URL scheme '{}'", url.scheme()),
            }
            .into());
        }
        Ok(())
    }
}

/// Shared collaborators every instance needs to do its work.
///
/// This is a cheap-to-clone handle.
#[derive(Clone, Debug, Handle)]
pub struct InstanceServices {
    inner: Arc<ServicesInner>,
}

#[derive(Debug)]
struct ServicesInner {
    keys: KeyStore,
    secrets: Arc<dyn OneTimeSecretStore>,
    connect_tokens: Arc<dyn OneTimeSecretStore>,
    http: reqwest::Client,
    callback_url: Url,
}

impl InstanceServices {
    /// Creates the services with an HTTP client bounded by `request_timeout`.
    ///
    /// `secrets` holds OAuth1 request secrets and `connect_tokens` the cloud
    /// connect tokens; the two must not share a namespace. `public_url` is
    /// this service's externally reachable base URL.
    pub fn new(
        keys: KeyStore,
        secrets: Arc<dyn OneTimeSecretStore>,
        connect_tokens: Arc<dyn OneTimeSecretStore>,
        public_url: &Url,
        request_timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| InstanceError::InvalidConfiguration {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        let callback_url =
            endpoint_url(public_url, ROUTE_OAUTH1_COMPLETE).map_err(|e| InstanceError::InvalidUrl {
                reason: e.to_string(),
            })?;

        Ok(Self {
            inner: Arc::new(ServicesInner {
                keys,
                secrets,
                connect_tokens,
                http,
                callback_url,
            }),
        })
    }

    pub fn keys(&self) -> &KeyStore {
        &self.inner.keys
    }

    pub fn secrets(&self) -> &Arc<dyn OneTimeSecretStore> {
        &self.inner.secrets
    }

    /// Store for cloud connect tokens.
    pub fn connect_tokens(&self) -> &Arc<dyn OneTimeSecretStore> {
        &self.inner.connect_tokens
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    /// Where the tracker redirects users after they approve access.
    pub fn callback_url(&self) -> &Url {
        &self.inner.callback_url
    }
}

/// The capability set every deployment variant provides.
#[async_trait]
pub trait InstanceCapabilities: Send + Sync {
    fn url(&self) -> &Url;

    /// Stable partition key for stored links, independent of the URL.
    fn storage_key(&self) -> &str;

    fn instance_type(&self) -> InstanceType;

    /// Label → value pairs describing the instance for display.
    fn display_details(&self) -> BTreeMap<String, String>;

    /// Starts connecting `host_user_id` and returns where to send the user.
    async fn begin_user_connect(&self, host_user_id: &str) -> Result<Url>;

    /// Trades an approved request token for a long-lived credential.
    async fn exchange_token(
        &self,
        request_token: &str,
        request_secret: &str,
        verifier: &str,
    ) -> Result<Credential>;

    /// Builds a client that calls the tracker as the credential's owner.
    async fn build_client_for(&self, credential: &Credential) -> Result<TrackerClient>;
}

/// One configured tracker deployment.
#[derive(Clone, Debug)]
pub enum Instance {
    Server(ServerInstance),
    Cloud(CloudInstance),
}

impl Instance {
    /// Builds the instance described by `config`.
    pub fn from_config(config: &InstanceConfig, services: InstanceServices) -> Result<Self> {
        config.validate()?;
        Ok(match config {
            InstanceConfig::Server(config) => {
                Instance::Server(ServerInstance::new(config.clone(), services))
            }
            InstanceConfig::Cloud(config) => {
                Instance::Cloud(CloudInstance::new(config.clone(), services))
            }
        })
    }

    fn capabilities(&self) -> &dyn InstanceCapabilities {
        match self {
            Instance::Server(server) => server,
            Instance::Cloud(cloud) => cloud,
        }
    }

    pub fn url(&self) -> &Url {
        self.capabilities().url()
    }

    pub fn storage_key(&self) -> &str {
        self.capabilities().storage_key()
    }

    pub fn instance_type(&self) -> InstanceType {
        self.capabilities().instance_type()
    }

    pub fn display_details(&self) -> BTreeMap<String, String> {
        self.capabilities().display_details()
    }

    pub async fn begin_user_connect(&self, host_user_id: &str) -> Result<Url> {
        self.capabilities().begin_user_connect(host_user_id).await
    }

    pub async fn exchange_token(
        &self,
        request_token: &str,
        request_secret: &str,
        verifier: &str,
    ) -> Result<Credential> {
        self.capabilities()
            .exchange_token(request_token, request_secret, verifier)
            .await
    }

    pub async fn build_client_for(&self, credential: &Credential) -> Result<TrackerClient> {
        self.capabilities().build_client_for(credential).await
    }
}

pub(crate) fn instance_endpoint(url: &Url, path: &str) -> Result<Url> {
    endpoint_url(url, path).map_err(|e| {
        InstanceError::InvalidUrl {
            reason: e.to_string(),
        }
        .into()
    })
}
