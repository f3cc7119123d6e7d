//! Data types exchanged with a tracker deployment.

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// The tracker's view of the authenticated user, as returned by
/// `GET /rest/api/2/myself`.
///
/// Self-hosted deployments identify users by `name`; vendor-hosted
/// deployments leave it empty and use `account_id` instead.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub email_address: String,
}

impl TrackerProfile {
    /// The identifier used for reverse lookups: `name`, else `account_id`.
    pub fn username(&self) -> &str {
        if self.name.is_empty() {
            &self.account_id
        } else {
            &self.name
        }
    }

    /// Label shown to host users, e.g. `Jane Doe (jdoe)`.
    pub fn label(&self) -> String {
        match (self.display_name.is_empty(), self.username().is_empty()) {
            (false, false) => format!("{} ({})", self.display_name, self.username()),
            (false, true) => self.display_name.clone(),
            _ => self.username().to_string(),
        }
    }
}

/// A per-user authorization credential for one tracker instance.
///
/// Secret material is wiped on drop and never shown by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credential {
    /// OAuth1 access token and token secret (self-hosted deployments).
    Oauth1 { token: String, secret: String },
    /// Opaque bearer token (vendor-hosted deployments).
    Bearer { token: String },
}

impl Credential {
    /// Short name of the credential shape, for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Credential::Oauth1 { .. } => "oauth1",
            Credential::Bearer { .. } => "bearer",
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Oauth1 { .. } => f
                .debug_struct("Oauth1")
                .field("token", &"<redacted>")
                .field("secret", &"<redacted>")
                .finish(),
            Credential::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        match self {
            Credential::Oauth1 { token, secret } => {
                token.zeroize();
                secret.zeroize();
            }
            Credential::Bearer { token } => token.zeroize(),
        }
    }
}
