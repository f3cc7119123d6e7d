//! RSA-SHA1 request signing (RFC 5849 section 3.4.3).

use base64ct::{Base64, Encoding};
use rand::RngCore;
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use sha1::Sha1;
use url::Url;

use super::errors::Oauth1Error;
use crate::clock::{Clock, SystemClock};

/// Percent-encodes per RFC 3986, leaving only unreserved characters as-is.
pub(crate) fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Builds the signature base string for a request.
///
/// The query string of `url` takes part in the normalized parameters, and
/// is dropped from the base string URI.
pub(crate) fn base_string(method: &str, url: &Url, params: &[(String, String)]) -> String {
    let mut base_url = url.clone();
    base_url.set_query(None);
    base_url.set_fragment(None);

    let mut pairs: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .chain(
            url.query_pairs()
                .map(|(k, v)| (percent_encode(&k), percent_encode(&v))),
        )
        .collect();
    pairs.sort();

    let normalized = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(base_url.as_str()),
        percent_encode(&normalized)
    )
}

/// Signs OAuth1 requests with this service's RSA private key.
///
/// The tracker verifies the signature with the public key an administrator
/// registered for `consumer_key`.
#[derive(Clone)]
pub struct Signer {
    consumer_key: String,
    key: SigningKey<Sha1>,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("consumer_key", &self.consumer_key)
            .finish_non_exhaustive()
    }
}

impl Signer {
    pub fn new(consumer_key: impl Into<String>, private_key: RsaPrivateKey) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            key: SigningKey::<Sha1>::new(private_key),
        }
    }

    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    /// Builds the `Authorization` header value for a request.
    ///
    /// `extra` carries protocol parameters such as `oauth_callback` or
    /// `oauth_verifier`; they are signed and sent in the header.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &Url,
        token: Option<&str>,
        extra: &[(&str, &str)],
    ) -> Result<String, Oauth1Error> {
        let mut nonce = [0u8; 16];
        OsRng.fill_bytes(&mut nonce);
        let timestamp = SystemClock.now_millis() / 1000;
        self.header_with(method, url, token, extra, &hex::encode(nonce), timestamp)
    }

    pub(crate) fn header_with(
        &self,
        method: &str,
        url: &Url,
        token: Option<&str>,
        extra: &[(&str, &str)],
        nonce: &str,
        timestamp: u64,
    ) -> Result<String, Oauth1Error> {
        let mut params: Vec<(String, String)> = vec![
            ("oauth_consumer_key".to_string(), self.consumer_key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            ("oauth_signature_method".to_string(), "RSA-SHA1".to_string()),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_version".to_string(), "1.0".to_string()),
        ];
        if let Some(token) = token {
            params.push(("oauth_token".to_string(), token.to_string()));
        }
        params.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));

        let base = base_string(method, url, &params);
        params.push(("oauth_signature".to_string(), self.sign(&base)?));
        params.sort();

        let fields = params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("OAuth {fields}"))
    }

    fn sign(&self, base: &str) -> Result<String, Oauth1Error> {
        let signature = self
            .key
            .try_sign_with_rng(&mut OsRng, base.as_bytes())
            .map_err(|e| Oauth1Error::SigningFailed {
                reason: e.to_string(),
            })?;
        Ok(Base64::encode_string(&signature.to_bytes()))
    }
}
