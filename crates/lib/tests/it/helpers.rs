use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use trackerlink::{
    Config, FixedClock, Instance, KeyStore,
    backend::{Backend, BackendError, InMemory},
    constants::CONNECT_TOKEN_PREFIX,
    host::{HostConfig, HostUser, StaticHost},
    instance::{InstanceConfig, InstanceServices, ServerConfig},
    store::{OneTimeSecretStore, OneTimeSecrets, TrackerUser, UserLinks, UserSettings},
    tracker::{Credential, TrackerProfile},
    web::AppState,
};
use url::Url;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Key size for tests; small enough to generate quickly.
pub const TEST_KEY_BITS: usize = 1024;

pub const PUBLIC_URL: &str = "https://link.test/";

pub const USER_ID: &str = "u1";
pub const ADMIN_ID: &str = "admin";

// ==========================
// CORE TEST FACTORIES
// ==========================

/// Creates a test backend based on TEST_BACKEND env var.
///
/// Supported values:
/// - "inmemory" or unset: InMemory backend (default)
/// - "sqlite": SQLite in-memory backend (requires `sqlite` feature)
pub async fn test_backend() -> Arc<dyn Backend> {
    match std::env::var("TEST_BACKEND").as_deref() {
        Ok("sqlite") => {
            #[cfg(feature = "sqlite")]
            {
                use trackerlink::backend::SqlxBackend;
                Arc::new(
                    SqlxBackend::sqlite_in_memory()
                        .await
                        .expect("Failed to create SQLite backend"),
                )
            }
            #[cfg(not(feature = "sqlite"))]
            {
                panic!("TEST_BACKEND=sqlite requires the `sqlite` feature")
            }
        }
        _ => Arc::new(InMemory::new()),
    }
}

pub fn public_url() -> Url {
    Url::parse(PUBLIC_URL).unwrap()
}

/// Host directory with a regular user and an administrator.
pub fn host_config() -> HostConfig {
    HostConfig {
        users: vec![
            HostUser {
                id: USER_ID.to_string(),
                username: "ada".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                nickname: String::new(),
            },
            HostUser {
                id: ADMIN_ID.to_string(),
                username: "root".to_string(),
                ..Default::default()
            },
        ],
        admins: vec![ADMIN_ID.to_string()],
    }
}

pub fn server_instance_config(key: &str, url: &str) -> InstanceConfig {
    InstanceConfig::Server(ServerConfig {
        key: key.to_string(),
        url: Url::parse(url).unwrap(),
        consumer_key: "trackerlink-test".to_string(),
    })
}

/// Service config pointing at `tracker_url`, or with no instance.
pub fn test_config(tracker_url: Option<&str>) -> Config {
    let mut config = Config::new(public_url());
    config.key_bits = TEST_KEY_BITS;
    config.request_timeout_secs = 5;
    config.instance = tracker_url.map(|url| server_instance_config("main", url));
    config.host = host_config();
    config
}

/// Instance services over `backend`, as the application wires them.
pub fn test_services(backend: &Arc<dyn Backend>) -> InstanceServices {
    test_services_with_timeout(backend, Duration::from_secs(5))
}

pub fn test_services_with_timeout(
    backend: &Arc<dyn Backend>,
    timeout: Duration,
) -> InstanceServices {
    let keys = KeyStore::with_key_bits(backend.clone(), TEST_KEY_BITS);
    let secrets: Arc<dyn OneTimeSecretStore> = Arc::new(OneTimeSecrets::new(backend.clone()));
    let connect_tokens: Arc<dyn OneTimeSecretStore> = Arc::new(connect_tokens(backend));
    InstanceServices::new(keys, secrets, connect_tokens, &public_url(), timeout).unwrap()
}

/// The cloud connect token store the application wires over `backend`.
pub fn connect_tokens(backend: &Arc<dyn Backend>) -> OneTimeSecrets {
    OneTimeSecrets::new(backend.clone()).with_prefix(CONNECT_TOKEN_PREFIX)
}

pub fn server_instance(backend: &Arc<dyn Backend>, key: &str, url: &str) -> Instance {
    Instance::from_config(&server_instance_config(key, url), test_services(backend)).unwrap()
}

pub fn profile(name: &str, display_name: &str) -> TrackerProfile {
    TrackerProfile {
        name: name.to_string(),
        display_name: display_name.to_string(),
        key: format!("KEY-{name}"),
        ..Default::default()
    }
}

pub fn tracker_user(name: &str, display_name: &str) -> TrackerUser {
    TrackerUser {
        profile: profile(name, display_name),
        credential: Credential::Oauth1 {
            token: format!("{name}-token"),
            secret: format!("{name}-secret"),
        },
        settings: UserSettings::default(),
        connected_at: "2024-01-01T00:00:00+00:00".to_string(),
    }
}

// ==========================
// APPLICATION HARNESS
// ==========================

/// A fully wired application over a shared backend.
pub struct TestApp {
    pub config: Config,
    pub backend: Arc<dyn Backend>,
    pub host: Arc<StaticHost>,
    /// Clock stamping new links.
    pub clock: Arc<FixedClock>,
    pub state: AppState,
    pub secrets: OneTimeSecrets,
    pub links: UserLinks,
}

impl TestApp {
    pub async fn new(config: Config) -> Self {
        Self::with_backend(config, test_backend().await).await
    }

    pub async fn with_backend(config: Config, backend: Arc<dyn Backend>) -> Self {
        let host = Arc::new(StaticHost::new(config.host.clone()));
        let clock = Arc::new(FixedClock::default());
        let state = AppState::with_host(&config, backend.clone(), host.clone(), clock.clone())
            .await
            .unwrap();
        Self {
            config,
            secrets: OneTimeSecrets::new(backend.clone()),
            links: UserLinks::new(backend.clone()),
            backend,
            host,
            clock,
            state,
        }
    }

    /// The configured instance, for inspecting the link store.
    pub fn instance(&self) -> Instance {
        let config = self
            .config
            .instance
            .as_ref()
            .expect("no tracker instance configured");
        Instance::from_config(config, test_services(&self.backend)).unwrap()
    }
}

// ==========================
// MOCK TRACKER
// ==========================

pub const REQUEST_TOKEN: &str = "req-token";
pub const REQUEST_SECRET: &str = "req-secret";
pub const ACCESS_TOKEN: &str = "access-token";
pub const ACCESS_SECRET: &str = "access-secret";
pub const VERIFIER: &str = "verifier-123";

/// Mounts the request-token endpoint on `server`.
pub async fn mount_request_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/plugins/servlet/oauth/request-token"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "oauth_token={REQUEST_TOKEN}&oauth_token_secret={REQUEST_SECRET}&oauth_callback_confirmed=true"
        )))
        .mount(server)
        .await;
}

/// Mounts the access-token endpoint on `server`.
pub async fn mount_access_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/plugins/servlet/oauth/access-token"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "oauth_token={ACCESS_TOKEN}&oauth_token_secret={ACCESS_SECRET}"
        )))
        .mount(server)
        .await;
}

/// Mounts `GET /rest/api/2/myself` answering with `name`/`display_name`.
pub async fn mount_myself(server: &MockServer, name: &str, display_name: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/api/2/myself"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": name,
            "displayName": display_name,
            "key": format!("KEY-{name}"),
            "emailAddress": format!("{name}@tracker.test"),
        })))
        .mount(server)
        .await;
}

/// Mounts every endpoint a successful handshake touches.
pub async fn mount_tracker(server: &MockServer, name: &str, display_name: &str) {
    mount_request_token(server).await;
    mount_access_token(server).await;
    mount_myself(server, name, display_name).await;
}

/// The callback query the tracker sends after approval.
pub fn callback_query() -> String {
    format!("oauth_token={REQUEST_TOKEN}&oauth_verifier={VERIFIER}")
}

// ==========================
// INSTRUMENTED BACKEND
// ==========================

/// Wraps a backend and counts operations on keys with a given prefix.
#[derive(Debug)]
pub struct CountingBackend {
    inner: Arc<dyn Backend>,
    prefix: String,
    hits: AtomicUsize,
}

impl CountingBackend {
    pub fn new(inner: Arc<dyn Backend>, prefix: &str) -> Self {
        Self {
            inner,
            prefix: prefix.to_string(),
            hits: AtomicUsize::new(0),
        }
    }

    /// Number of operations touching a key with the prefix.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn record(&self, key: &str) {
        if key.starts_with(&self.prefix) {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl Backend for CountingBackend {
    async fn get(&self, key: &str) -> trackerlink::Result<Option<String>> {
        self.record(key);
        self.inner.get(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> trackerlink::Result<()> {
        self.record(key);
        self.inner.set(key, value, ttl).await
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> trackerlink::Result<bool> {
        self.record(key);
        self.inner.set_if_absent(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> trackerlink::Result<()> {
        self.record(key);
        self.inner.delete(key).await
    }

    async fn take(&self, key: &str) -> trackerlink::Result<Option<String>> {
        self.record(key);
        self.inner.take(key).await
    }

    fn kind_name(&self) -> &'static str {
        self.inner.kind_name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Wraps a backend and fails every `set` on keys with a given prefix.
#[derive(Debug)]
pub struct FailingSetBackend {
    inner: Arc<dyn Backend>,
    prefix: String,
}

impl FailingSetBackend {
    pub fn new(inner: Arc<dyn Backend>, prefix: &str) -> Self {
        Self {
            inner,
            prefix: prefix.to_string(),
        }
    }

    fn check(&self, key: &str) -> trackerlink::Result<()> {
        if key.starts_with(&self.prefix) {
            return Err(BackendError::StateInconsistency {
                reason: format!("write refused for {key}"),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for FailingSetBackend {
    async fn get(&self, key: &str) -> trackerlink::Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> trackerlink::Result<()> {
        self.check(key)?;
        self.inner.set(key, value, ttl).await
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> trackerlink::Result<bool> {
        self.check(key)?;
        self.inner.set_if_absent(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> trackerlink::Result<()> {
        self.inner.delete(key).await
    }

    async fn take(&self, key: &str) -> trackerlink::Result<Option<String>> {
        self.inner.take(key).await
    }

    fn kind_name(&self) -> &'static str {
        self.inner.kind_name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
