//! Three-legged OAuth1 against a self-hosted tracker.
//!
//! The flow has three legs:
//!
//! 1. [`Oauth1Client::request_token`] obtains a temporary request token and
//!    secret, naming this service's callback URL.
//! 2. The user approves access at [`authorization_url`] and the tracker
//!    redirects back with the request token and a verifier, which
//!    [`parse_callback`] extracts.
//! 3. [`Oauth1Client::access_token`] trades the request token and verifier
//!    for a long-lived access token.
//!
//! Every request is signed with RSA-SHA1 by a [`Signer`] holding the
//! service's private key.

mod errors;
mod signature;

use std::sync::Arc;

use url::Url;
use zeroize::Zeroize;

pub use errors::Oauth1Error;
pub use signature::Signer;

use crate::Result;

/// Query parameter carrying the request token on the callback.
pub const PARAM_TOKEN: &str = "oauth_token";
/// Query parameter carrying the verifier on the callback.
pub const PARAM_VERIFIER: &str = "oauth_verifier";

/// The request token and verifier carried by the tracker's redirect back.
#[derive(Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub token: String,
    pub verifier: String,
}

impl std::fmt::Debug for CallbackParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackParams")
            .field("token", &self.token)
            .field("verifier", &"<redacted>")
            .finish()
    }
}

/// Extracts the request token and verifier from a raw callback query string.
///
/// Both must be present and non-empty.
pub fn parse_callback(query: &str) -> Result<CallbackParams> {
    let mut token = None;
    let mut verifier = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            PARAM_TOKEN => token = Some(value.into_owned()),
            PARAM_VERIFIER => verifier = Some(value.into_owned()),
            _ => {}
        }
    }

    let token = token
        .filter(|t| !t.is_empty())
        .ok_or(Oauth1Error::MissingCallbackParameter { name: PARAM_TOKEN })?;
    let verifier = verifier
        .filter(|v| !v.is_empty())
        .ok_or(Oauth1Error::MissingCallbackParameter {
            name: PARAM_VERIFIER,
        })?;

    Ok(CallbackParams { token, verifier })
}

/// A token and its secret as issued by a token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub token: String,
    pub secret: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("token", &self.token)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Drop for TokenPair {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

/// Builds the URL the user visits to approve a request token.
pub fn authorization_url(endpoint: &Url, request_token: &str) -> Url {
    let mut url = endpoint.clone();
    url.query_pairs_mut()
        .append_pair(PARAM_TOKEN, request_token);
    url
}

/// Client for the tracker's request-token and access-token endpoints.
#[derive(Clone, Debug)]
pub struct Oauth1Client {
    signer: Arc<Signer>,
    http: reqwest::Client,
}

impl Oauth1Client {
    pub fn new(signer: Arc<Signer>, http: reqwest::Client) -> Self {
        Self { signer, http }
    }

    /// Obtains a temporary request token.
    ///
    /// `callback` is where the tracker sends the user after approval.
    pub async fn request_token(&self, endpoint: &Url, callback: &str) -> Result<TokenPair> {
        self.post_for_token(endpoint, None, &[("oauth_callback", callback)])
            .await
    }

    /// Exchanges an approved request token for an access token.
    ///
    /// RSA-SHA1 signatures are computed without the request token secret;
    /// the tracker identifies the pending grant by the token and verifier.
    pub async fn access_token(
        &self,
        endpoint: &Url,
        request: &TokenPair,
        verifier: &str,
    ) -> Result<TokenPair> {
        self.post_for_token(
            endpoint,
            Some(&request.token),
            &[("oauth_verifier", verifier)],
        )
        .await
    }

    async fn post_for_token(
        &self,
        endpoint: &Url,
        token: Option<&str>,
        extra: &[(&str, &str)],
    ) -> Result<TokenPair> {
        let url = endpoint.as_str();
        let header = self
            .signer
            .authorization_header("POST", endpoint, token, extra)?;

        let response = self
            .http
            .post(endpoint.clone())
            .header(reqwest::header::AUTHORIZATION, header)
            .send()
            .await
            .map_err(|e| Oauth1Error::from_send(url, e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url, status = status.as_u16(), "OAuth token request rejected");
            return Err(Oauth1Error::Rejected {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| Oauth1Error::from_send(url, e))?;
        Ok(parse_token_response(url, &body)?)
    }
}

fn parse_token_response(url: &str, body: &str) -> std::result::Result<TokenPair, Oauth1Error> {
    let mut token = None;
    let mut secret = None;
    for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
        match key.as_ref() {
            "oauth_token" => token = Some(value.into_owned()),
            "oauth_token_secret" => secret = Some(value.into_owned()),
            "oauth_problem" => {
                return Err(Oauth1Error::MalformedResponse {
                    url: url.to_string(),
                    reason: format!("tracker reported problem '{value}'"),
                });
            }
            _ => {}
        }
    }

    match (token, secret) {
        (Some(token), Some(secret)) if !token.is_empty() => Ok(TokenPair { token, secret }),
        _ => Err(Oauth1Error::MalformedResponse {
            url: url.to_string(),
            reason: "missing oauth_token or oauth_token_secret".to_string(),
        }),
    }
}
