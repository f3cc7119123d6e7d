use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{InstanceCapabilities, InstanceError, InstanceServices, InstanceType, instance_endpoint};
use crate::Result;
use crate::oauth1::{self, Oauth1Client, Signer, TokenPair};
use crate::tracker::{Credential, TrackerClient};

/// Consumer key used when the configuration does not name one.
pub const DEFAULT_CONSUMER_KEY: &str = "trackerlink";

const REQUEST_TOKEN_PATH: &str = "plugins/servlet/oauth/request-token";
const AUTHORIZE_PATH: &str = "plugins/servlet/oauth/authorize";
const ACCESS_TOKEN_PATH: &str = "plugins/servlet/oauth/access-token";

fn default_consumer_key() -> String {
    DEFAULT_CONSUMER_KEY.to_string()
}

/// Configuration of a self-hosted tracker deployment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Stable partition key for this deployment's links.
    pub key: String,
    /// Base URL of the deployment, including any context path.
    pub url: Url,
    /// Consumer key of the application link registered on the tracker.
    #[serde(default = "default_consumer_key")]
    pub consumer_key: String,
}

/// A self-hosted tracker reached through OAuth1 RSA-SHA1.
#[derive(Clone, Debug)]
pub struct ServerInstance {
    config: ServerConfig,
    services: InstanceServices,
}

impl ServerInstance {
    pub fn new(config: ServerConfig, services: InstanceServices) -> Self {
        Self { config, services }
    }

    pub fn consumer_key(&self) -> &str {
        &self.config.consumer_key
    }

    async fn signer(&self) -> Result<Arc<Signer>> {
        let keypair = self.services.keys().ensure_keypair().await?;
        Ok(Arc::new(Signer::new(
            self.config.consumer_key.clone(),
            keypair.private_key().clone(),
        )))
    }

    async fn oauth_client(&self) -> Result<Oauth1Client> {
        Ok(Oauth1Client::new(
            self.signer().await?,
            self.services.http().clone(),
        ))
    }
}

#[async_trait]
impl InstanceCapabilities for ServerInstance {
    fn url(&self) -> &Url {
        &self.config.url
    }

    fn storage_key(&self) -> &str {
        &self.config.key
    }

    fn instance_type(&self) -> InstanceType {
        InstanceType::Server
    }

    fn display_details(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("Tracker Type".to_string(), "Server".to_string()),
            ("Tracker URL".to_string(), self.config.url.to_string()),
            (
                "Application Link Consumer Key".to_string(),
                self.config.consumer_key.clone(),
            ),
        ])
    }

    async fn begin_user_connect(&self, host_user_id: &str) -> Result<Url> {
        let client = self.oauth_client().await?;
        let request = client
            .request_token(
                &instance_endpoint(&self.config.url, REQUEST_TOKEN_PATH)?,
                self.services.callback_url().as_str(),
            )
            .await?;

        self.services
            .secrets()
            .store(&request.token, &request.secret)
            .await?;

        tracing::debug!(
            instance = %self.config.key,
            host_user_id,
            "Obtained request token, redirecting user for approval"
        );
        Ok(oauth1::authorization_url(
            &instance_endpoint(&self.config.url, AUTHORIZE_PATH)?,
            &request.token,
        ))
    }

    async fn exchange_token(
        &self,
        request_token: &str,
        request_secret: &str,
        verifier: &str,
    ) -> Result<Credential> {
        let client = self.oauth_client().await?;
        let request = TokenPair {
            token: request_token.to_string(),
            secret: request_secret.to_string(),
        };
        let access = client
            .access_token(
                &instance_endpoint(&self.config.url, ACCESS_TOKEN_PATH)?,
                &request,
                verifier,
            )
            .await?;

        Ok(Credential::Oauth1 {
            token: access.token.clone(),
            secret: access.secret.clone(),
        })
    }

    async fn build_client_for(&self, credential: &Credential) -> Result<TrackerClient> {
        match credential {
            Credential::Oauth1 { token, .. } => Ok(TrackerClient::oauth1(
                self.config.url.clone(),
                self.services.http().clone(),
                self.signer().await?,
                token,
            )),
            other => Err(InstanceError::UnsupportedCredential {
                instance_type: InstanceType::Server.as_str(),
                credential: other.kind(),
            }
            .into()),
        }
    }
}
