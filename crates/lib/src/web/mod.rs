//! HTTP endpoints.
//!
//! | Route | Method | Purpose |
//! |-------|--------|---------|
//! | `/oauth1/complete` | GET | Tracker redirect back; completes the handshake |
//! | `/oauth1/public_key` | GET | PEM public key, administrators only |
//! | `/oauth1/connect` | GET | Redirects the caller to the tracker to connect |
//! | `/user/disconnect` | POST | Removes the caller's link |
//! | `/api/v1/userinfo` | GET | Caller's connection status as JSON |
//! | `/health` | GET | Liveness and backend kind |
//!
//! The host platform injects the caller's id in the
//! [`HOST_USER_ID_HEADER`] header; requests without it are unauthorized on
//! every route except `/health`.

mod error;
pub mod templates;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{RawQuery, State},
    http::{HeaderMap, Method, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{any, get, post},
};
use serde::Serialize;

pub use error::{ApiError, status_for};

use crate::Config;
use crate::backend::Backend;
use crate::clock::{Clock, SystemClock};
use crate::constants::{
    CONNECT_TOKEN_PREFIX, HOST_USER_ID_HEADER, ROUTE_HEALTH, ROUTE_OAUTH1_COMPLETE,
    ROUTE_OAUTH1_PUBLIC_KEY, ROUTE_USER_CONNECT, ROUTE_USER_DISCONNECT, ROUTE_USER_INFO,
};
use crate::handshake::{HandshakeOrchestrator, UserInfo};
use crate::host::{HostApi, HostError, Permission, StaticHost};
use crate::instance::{ConfiguredRegistry, InstanceServices};
use crate::keys::KeyStore;
use crate::store::{OneTimeSecretStore, OneTimeSecrets, UserLinkStore, UserLinks};

/// Shared application state
#[derive(Clone, Debug)]
pub struct AppState {
    pub orchestrator: HandshakeOrchestrator,
    pub keys: KeyStore,
    pub host: Arc<dyn HostApi>,
    pub backend: Arc<dyn Backend>,
}

impl AppState {
    /// Wires every component over `backend` as described by `config`.
    ///
    /// The host directory is the config's [`StaticHost`].
    pub async fn from_config(config: &Config, backend: Arc<dyn Backend>) -> crate::Result<Self> {
        let host: Arc<dyn HostApi> = Arc::new(StaticHost::new(config.host.clone()));
        Self::with_host(config, backend, host, Arc::new(SystemClock)).await
    }

    /// Like [`AppState::from_config`] with a caller-supplied host platform
    /// and clock.
    pub async fn with_host(
        config: &Config,
        backend: Arc<dyn Backend>,
        host: Arc<dyn HostApi>,
        clock: Arc<dyn Clock>,
    ) -> crate::Result<Self> {
        let keys = KeyStore::with_key_bits(backend.clone(), config.key_bits);
        let secrets: Arc<dyn OneTimeSecretStore> =
            Arc::new(OneTimeSecrets::with_ttl(backend.clone(), config.secret_ttl()));
        let connect_tokens: Arc<dyn OneTimeSecretStore> = Arc::new(
            OneTimeSecrets::with_ttl(backend.clone(), config.secret_ttl())
                .with_prefix(CONNECT_TOKEN_PREFIX),
        );
        let links: Arc<dyn UserLinkStore> = Arc::new(UserLinks::new(backend.clone()));

        let services = InstanceServices::new(
            keys.clone(),
            secrets.clone(),
            connect_tokens,
            &config.public_url,
            config.request_timeout(),
        )?;
        let registry =
            ConfiguredRegistry::open(backend.clone(), services, config.instance.clone()).await?;
        let orchestrator = HandshakeOrchestrator::new(
            Arc::new(registry),
            secrets,
            links,
            host.clone(),
            clock,
            &config.public_url,
        )?;

        Ok(Self {
            orchestrator,
            keys,
            host,
            backend,
        })
    }
}

/// Builds the router serving every endpoint.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(ROUTE_OAUTH1_COMPLETE, get(handle_oauth1_complete))
        .route(ROUTE_OAUTH1_PUBLIC_KEY, any(handle_public_key))
        .route(ROUTE_USER_CONNECT, get(handle_connect))
        .route(ROUTE_USER_DISCONNECT, post(handle_disconnect))
        .route(ROUTE_USER_INFO, get(handle_user_info))
        .route(ROUTE_HEALTH, get(handle_health))
        .with_state(state)
}

/// Caller identity from the trusted header, if present and non-empty.
fn caller_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(HOST_USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

/// Handler for GET /oauth1/complete
async fn handle_oauth1_complete(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<Html<String>, ApiError> {
    let confirmation = state
        .orchestrator
        .complete(caller_id(&headers), query.as_deref().unwrap_or_default())
        .await?;
    Ok(Html(templates::connected_page(&confirmation)))
}

/// Handler for /oauth1/public_key
///
/// Checks run in order: method, identity, permission. Key material is only
/// touched once all three pass.
async fn handle_public_key(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if method != Method::GET {
        return Err(ApiError::method_not_allowed());
    }

    let user_id =
        caller_id(&headers).ok_or_else(|| crate::Error::from(HostError::MissingIdentity))?;

    if !state
        .host
        .has_permission(user_id, Permission::ManageSystem)
        .await
    {
        return Err(crate::Error::from(HostError::PermissionDenied {
            user_id: user_id.to_string(),
            permission: Permission::ManageSystem,
        })
        .into());
    }

    let pem = state.keys.ensure_keypair().await?.public_key_pem()?;
    Ok(([(header::CONTENT_TYPE, "text/plain")], pem).into_response())
}

/// Handler for GET /oauth1/connect
async fn handle_connect(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Redirect, ApiError> {
    let url = state.orchestrator.begin(caller_id(&headers)).await?;
    Ok(Redirect::to(url.as_str()))
}

/// Handler for POST /user/disconnect
async fn handle_disconnect(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>, ApiError> {
    let disconnection = state.orchestrator.disconnect(caller_id(&headers)).await?;
    Ok(Html(templates::disconnected_page(&disconnection)))
}

/// Handler for GET /api/v1/userinfo
async fn handle_user_info(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserInfo>, ApiError> {
    let info = state.orchestrator.user_info(caller_id(&headers)).await?;
    Ok(Json(info))
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    backend: &'static str,
}

/// Handler for GET /health
async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        backend: state.backend.kind_name(),
    })
}
