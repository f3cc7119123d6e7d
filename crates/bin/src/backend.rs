//! Backend creation, config loading and utility functions.

use std::path::PathBuf;
use std::sync::Arc;

use trackerlink::{
    Config,
    backend::{Backend as StorageBackend, InMemory, SqlxBackend},
};
use url::Url;

use crate::cli::{Backend, BackendArgs, ConfigArgs};

/// File name of the SQLite database inside the data directory.
pub const SQLITE_FILE: &str = "trackerlink.db";

/// File name of the in-memory backend's JSON snapshot inside the data directory.
pub const INMEMORY_FILE: &str = "trackerlink.json";

/// Redact credentials from a PostgreSQL connection URL for safe logging
pub fn redact_postgres_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        let mut redacted = parsed.clone();
        if !parsed.username().is_empty() {
            let _ = redacted.set_username("***");
        }
        if parsed.password().is_some() {
            let _ = redacted.set_password(Some("***"));
        }
        redacted.to_string()
    } else {
        "postgres://***@<unparsable-url>".to_string()
    }
}

/// The data directory, defaulting to the working directory.
pub fn data_dir(args: &BackendArgs) -> PathBuf {
    args.data_dir.clone().unwrap_or_else(|| PathBuf::from("."))
}

/// Create the appropriate backend based on configuration
pub async fn create_backend(
    args: &BackendArgs,
) -> Result<Arc<dyn StorageBackend>, Box<dyn std::error::Error>> {
    let data_dir = data_dir(args);

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir).await?;

    match args.backend {
        Backend::Sqlite => {
            let db_path = data_dir.join(SQLITE_FILE);
            tracing::info!("Using SQLite backend at {}", db_path.display());
            Ok(Arc::new(SqlxBackend::open_sqlite(&db_path).await?))
        }
        Backend::Postgres => {
            let url = args
                .postgres_url
                .as_ref()
                .ok_or("PostgreSQL backend requires --postgres-url or TRACKERLINK_POSTGRES_URL")?;

            let display_url = redact_postgres_url(url);
            tracing::info!("Connecting to PostgreSQL backend at {}", display_url);

            match SqlxBackend::connect_postgres(url).await {
                Ok(backend) => {
                    tracing::info!("Connected to PostgreSQL successfully");
                    Ok(Arc::new(backend))
                }
                Err(e) => {
                    Err(format!("Failed to connect to PostgreSQL at {}: {}", display_url, e).into())
                }
            }
        }
        Backend::Inmemory => {
            let json_path = data_dir.join(INMEMORY_FILE);
            tracing::info!(
                "Using in-memory backend with persistence at {}",
                json_path.display()
            );
            Ok(Arc::new(InMemory::load_from_file(&json_path).await?))
        }
    }
}

/// Loads the service config from the file, or builds a default one around
/// the public URL.
pub async fn load_config(
    args: &ConfigArgs,
    fallback_port: u16,
) -> Result<Config, Box<dyn std::error::Error>> {
    match &args.config {
        Some(path) => {
            let mut config = Config::load(path).await?;
            if let Some(public_url) = &args.public_url {
                config.public_url = public_url.clone();
            }
            tracing::info!("Loaded config from {}", path.display());
            Ok(config)
        }
        None => {
            let public_url = match &args.public_url {
                Some(url) => url.clone(),
                None => Url::parse(&format!("http://localhost:{fallback_port}/"))?,
            };
            tracing::warn!(
                %public_url,
                "No config file given; running without a tracker instance"
            );
            let config = Config::new(public_url);
            config.validate()?;
            Ok(config)
        }
    }
}
