//! Service configuration.
//!
//! A JSON file read once at startup:
//!
//! ```json
//! {
//!   "public_url": "https://link.example.com/",
//!   "request_timeout_secs": 30,
//!   "key_bits": 2048,
//!   "secret_ttl_secs": 900,
//!   "instance": { "type": "server", "key": "main", "url": "https://tracker.example.com/" },
//!   "host": { "users": [{ "id": "u1", "username": "ada" }], "admins": ["u1"] }
//! }
//! ```
//!
//! Only `public_url` is required.

mod errors;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

pub use errors::ConfigError;

use crate::Result;
use crate::constants::{DEFAULT_KEY_BITS, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SECRET_TTL};
use crate::host::HostConfig;
use crate::instance::InstanceConfig;

/// Smallest RSA modulus accepted for the trust keypair.
pub const MIN_KEY_BITS: usize = 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Externally reachable base URL of this service.
    pub public_url: Url,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_key_bits")]
    pub key_bits: usize,
    #[serde(default = "default_secret_ttl_secs")]
    pub secret_ttl_secs: u64,
    /// Active instance. Replaces any selection persisted in the backend;
    /// when absent the persisted selection is kept.
    #[serde(default)]
    pub instance: Option<InstanceConfig>,
    #[serde(default)]
    pub host: HostConfig,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_key_bits() -> usize {
    DEFAULT_KEY_BITS
}

fn default_secret_ttl_secs() -> u64 {
    DEFAULT_SECRET_TTL.as_secs()
}

impl Config {
    /// A config with defaults for everything except `public_url`.
    pub fn new(public_url: Url) -> Self {
        Self {
            public_url,
            request_timeout_secs: default_request_timeout_secs(),
            key_bits: default_key_bits(),
            secret_ttl_secs: default_secret_ttl_secs(),
            instance: None,
            host: HostConfig::default(),
        }
    }

    /// Reads, parses and validates the config file at `path`.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::from_json(&text).map_err(|err| match err {
            crate::Error::Serialize(source) => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
            .into(),
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parses and validates a config from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !matches!(self.public_url.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "public_url must be http or https, got '{}'",
                self.public_url.scheme()
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs must be positive"));
        }
        if self.secret_ttl_secs == 0 {
            return Err(invalid("secret_ttl_secs must be positive"));
        }
        if self.key_bits < MIN_KEY_BITS {
            return Err(invalid(format!("key_bits must be at least {MIN_KEY_BITS}")));
        }
        if let Some(instance) = &self.instance {
            instance.validate()?;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn secret_ttl(&self) -> Duration {
        Duration::from_secs(self.secret_ttl_secs)
    }
}

fn invalid(reason: impl Into<String>) -> crate::Error {
    ConfigError::Invalid {
        reason: reason.into(),
    }
    .into()
}
