//! Authenticated access to a tracker deployment's REST API.
//!
//! A [`TrackerClient`] is bound to one instance URL and one user's
//! credential. Instances build clients through
//! [`Instance::build_client_for`](crate::instance::Instance::build_client_for),
//! which picks the authentication scheme the deployment variant expects.

mod errors;
mod types;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use url::Url;
use zeroize::Zeroizing;

pub use errors::TrackerError;
pub use types::{Credential, TrackerProfile};

use crate::Result;
use crate::oauth1::Signer;

/// Path of the "current user" resource.
pub const MYSELF_PATH: &str = "rest/api/2/myself";

/// Joins `path` onto an instance base URL, keeping any path prefix the
/// base URL carries (e.g. a context path like `/jira`).
pub fn endpoint_url(base: &Url, path: &str) -> std::result::Result<Url, url::ParseError> {
    Url::parse(&format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    ))
}

#[derive(Clone)]
enum ClientAuth {
    Oauth1 {
        signer: Arc<Signer>,
        token: Zeroizing<String>,
    },
    Bearer {
        token: Zeroizing<String>,
    },
}

/// Client for one user's calls against one tracker instance.
#[derive(Clone)]
pub struct TrackerClient {
    base_url: Url,
    http: reqwest::Client,
    auth: ClientAuth,
}

impl std::fmt::Debug for TrackerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scheme = match self.auth {
            ClientAuth::Oauth1 { .. } => "oauth1",
            ClientAuth::Bearer { .. } => "bearer",
        };
        f.debug_struct("TrackerClient")
            .field("base_url", &self.base_url.as_str())
            .field("auth", &scheme)
            .finish()
    }
}

impl TrackerClient {
    /// A client that signs every request with OAuth1 RSA-SHA1.
    pub fn oauth1(base_url: Url, http: reqwest::Client, signer: Arc<Signer>, token: &str) -> Self {
        Self {
            base_url,
            http,
            auth: ClientAuth::Oauth1 {
                signer,
                token: Zeroizing::new(token.to_string()),
            },
        }
    }

    /// A client that sends a bearer token.
    pub fn bearer(base_url: Url, http: reqwest::Client, token: &str) -> Self {
        Self {
            base_url,
            http,
            auth: ClientAuth::Bearer {
                token: Zeroizing::new(token.to_string()),
            },
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetches the profile of the user the credential belongs to.
    pub async fn get_self(&self) -> Result<TrackerProfile> {
        self.get_json(MYSELF_PATH).await
    }

    /// Issues an authenticated `GET` and decodes the JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = endpoint_url(&self.base_url, path).map_err(|e| TrackerError::InvalidUrl {
            reason: e.to_string(),
        })?;
        let url_str = url.to_string();

        let request = self.http.get(url.clone());
        let request = match &self.auth {
            ClientAuth::Oauth1 { signer, token } => {
                let header = signer.authorization_header("GET", &url, Some(token.as_str()), &[])?;
                request.header(reqwest::header::AUTHORIZATION, header)
            }
            ClientAuth::Bearer { token } => request.bearer_auth(token.as_str()),
        };

        let response = request
            .send()
            .await
            .map_err(|e| TrackerError::from_send(&url_str, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::Status {
                url: url_str,
                status: status.as_u16(),
            }
            .into());
        }

        let value = response.json().await.map_err(|e| TrackerError::Decode {
            url: url_str.clone(),
            source: e,
        })?;
        tracing::debug!(url = %url_str, "Tracker request succeeded");
        Ok(value)
    }
}
