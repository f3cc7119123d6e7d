//! The RSA keypair a tracker deployment trusts.
//!
//! An administrator registers the public half with the tracker as the
//! consumer key's public key; every OAuth1 request this service sends is
//! signed with the private half.
//!
//! The keypair is created lazily on first use. Creation goes through
//! [`Backend::set_if_absent`], so when several callers (or several processes
//! sharing one database) race on first use, exactly one key is stored and
//! every caller ends up with that one.

mod errors;

use std::sync::Arc;

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use tokio::sync::OnceCell;

pub use errors::KeyError;

use crate::Result;
use crate::backend::Backend;
use crate::constants::{DEFAULT_KEY_BITS, RSA_KEY};

/// The service's RSA keypair.
#[derive(Clone, PartialEq, Eq)]
pub struct Keypair {
    private: RsaPrivateKey,
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair").finish_non_exhaustive()
    }
}

impl Keypair {
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    pub fn public_key(&self) -> RsaPublicKey {
        self.private.to_public_key()
    }

    /// The public key as a PEM-encoded SubjectPublicKeyInfo document.
    pub fn public_key_pem(&self) -> Result<String> {
        self.public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| {
                KeyError::EncodingFailed {
                    reason: e.to_string(),
                }
                .into()
            })
    }

    fn to_pem(&self) -> Result<String> {
        let pem = self
            .private
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| KeyError::EncodingFailed {
                reason: e.to_string(),
            })?;
        Ok(pem.to_string())
    }

    fn from_pem(pem: &str) -> Result<Self> {
        let private = RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| KeyError::DecodingFailed {
            reason: e.to_string(),
        })?;
        Ok(Self { private })
    }
}

/// Lazily created, process-wide keypair persisted in a [`Backend`].
///
/// Clones share the in-memory cache.
#[derive(Clone, Debug)]
pub struct KeyStore {
    backend: Arc<dyn Backend>,
    key_bits: usize,
    cached: Arc<OnceCell<Keypair>>,
}

impl KeyStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_key_bits(backend, DEFAULT_KEY_BITS)
    }

    /// A key store that generates keys of `key_bits` bits.
    pub fn with_key_bits(backend: Arc<dyn Backend>, key_bits: usize) -> Self {
        Self {
            backend,
            key_bits,
            cached: Arc::new(OnceCell::new()),
        }
    }

    /// Returns the stored keypair, generating and storing one if none exists.
    pub async fn ensure_keypair(&self) -> Result<Keypair> {
        let keypair = self
            .cached
            .get_or_try_init(|| self.load_or_create())
            .await?;
        Ok(keypair.clone())
    }

    async fn load_or_create(&self) -> Result<Keypair> {
        if let Some(pem) = self.backend.get(RSA_KEY).await? {
            return Keypair::from_pem(&pem);
        }

        let keypair = self.generate().await?;
        if self
            .backend
            .set_if_absent(RSA_KEY, keypair.to_pem()?, None)
            .await?
        {
            tracing::info!(bits = self.key_bits, "Generated new RSA keypair");
            return Ok(keypair);
        }

        tracing::debug!("Another writer stored the RSA keypair first, using theirs");
        match self.backend.get(RSA_KEY).await? {
            Some(pem) => Keypair::from_pem(&pem),
            None => Err(KeyError::LostRace.into()),
        }
    }

    async fn generate(&self) -> Result<Keypair> {
        let bits = self.key_bits;
        let private = tokio::task::spawn_blocking(move || RsaPrivateKey::new(&mut OsRng, bits))
            .await
            .map_err(|e| KeyError::TaskFailed {
                reason: e.to_string(),
            })?
            .map_err(|e| KeyError::GenerationFailed {
                reason: e.to_string(),
            })?;
        Ok(Keypair { private })
    }
}
