use std::collections::BTreeMap;

use async_trait::async_trait;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{InstanceCapabilities, InstanceError, InstanceServices, InstanceType, instance_endpoint};
use crate::Result;
use crate::tracker::{Credential, TrackerClient};

/// Query parameter carrying the connect token to the app's config page.
pub const CONNECT_TOKEN_PARAM: &str = "mm_token";

/// Configuration of a vendor-hosted tracker deployment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Stable partition key for this deployment's links.
    pub key: String,
    /// Base URL of the site.
    pub url: Url,
    /// Key of the app installed on the site.
    pub app_key: String,
}

/// A vendor-hosted tracker reached through an installed app.
///
/// Users connect on the app's configuration page inside the tracker; the
/// app later calls back with a bearer credential. This side only issues the
/// connect token and uses bearer credentials.
#[derive(Clone, Debug)]
pub struct CloudInstance {
    config: CloudConfig,
    services: InstanceServices,
}

impl CloudInstance {
    pub fn new(config: CloudConfig, services: InstanceServices) -> Self {
        Self { config, services }
    }

    pub fn app_key(&self) -> &str {
        &self.config.app_key
    }
}

#[async_trait]
impl InstanceCapabilities for CloudInstance {
    fn url(&self) -> &Url {
        &self.config.url
    }

    fn storage_key(&self) -> &str {
        &self.config.key
    }

    fn instance_type(&self) -> InstanceType {
        InstanceType::Cloud
    }

    fn display_details(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("Tracker Type".to_string(), "Cloud".to_string()),
            ("Tracker URL".to_string(), self.config.url.to_string()),
            ("App Key".to_string(), self.config.app_key.clone()),
        ])
    }

    /// Binds a fresh connect token to `host_user_id` and points the user at
    /// the app's configuration page.
    async fn begin_user_connect(&self, host_user_id: &str) -> Result<Url> {
        let mut raw = [0u8; 32];
        OsRng.fill_bytes(&mut raw);
        let token = hex::encode(raw);

        self.services
            .connect_tokens()
            .store(&token, host_user_id)
            .await?;

        let mut url = instance_endpoint(
            &self.config.url,
            &format!("plugins/servlet/ac/{}/user-config", self.config.app_key),
        )?;
        url.query_pairs_mut()
            .append_pair(CONNECT_TOKEN_PARAM, &token);
        Ok(url)
    }

    async fn exchange_token(
        &self,
        _request_token: &str,
        _request_secret: &str,
        _verifier: &str,
    ) -> Result<Credential> {
        Err(InstanceError::UnsupportedOperation {
            instance_type: InstanceType::Cloud.as_str(),
            operation: "OAuth1 token exchange",
        }
        .into())
    }

    async fn build_client_for(&self, credential: &Credential) -> Result<TrackerClient> {
        match credential {
            Credential::Bearer { token } => Ok(TrackerClient::bearer(
                self.config.url.clone(),
                self.services.http().clone(),
                token,
            )),
            other => Err(InstanceError::UnsupportedCredential {
                instance_type: InstanceType::Cloud.as_str(),
                credential: other.kind(),
            }
            .into()),
        }
    }
}
