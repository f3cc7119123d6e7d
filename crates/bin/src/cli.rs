//! CLI argument definitions for the trackerlink binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use url::Url;

/// Storage backend type
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Backend {
    /// SQLite database (default, production-ready)
    Sqlite,
    /// PostgreSQL database (for multi-node deployments)
    Postgres,
    /// In-memory with JSON persistence (for development and ephemeral deployments)
    Inmemory,
}

/// trackerlink: link host platform users to issue tracker accounts
#[derive(Parser, Debug)]
#[command(name = "trackerlink")]
#[command(about = "Links host platform users to issue tracker accounts over OAuth1")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the trackerlink server
    Serve(ServeArgs),
    /// Print the PEM public key to register with the tracker
    PublicKey(PublicKeyArgs),
    /// Check health of a running trackerlink server
    Health(HealthArgs),
}

/// Storage options shared by commands that open the backend
#[derive(clap::Args, Debug)]
pub struct BackendArgs {
    /// Storage backend to use
    #[arg(short, long, default_value = "sqlite", env = "TRACKERLINK_BACKEND")]
    pub backend: Backend,

    /// Data directory for storage files.
    /// For SQLite: stores trackerlink.db
    /// For InMemory: stores trackerlink.json
    #[arg(short = 'D', long, env = "TRACKERLINK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// PostgreSQL connection URL (required when backend=postgres)
    #[arg(long, env = "TRACKERLINK_POSTGRES_URL")]
    pub postgres_url: Option<String>,
}

/// Service configuration source
#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    /// Path to the JSON service config file
    #[arg(short, long, env = "TRACKERLINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Externally reachable base URL, used when no config file is given
    #[arg(long, env = "TRACKERLINK_PUBLIC_URL")]
    pub public_url: Option<Url>,
}

/// Arguments for the serve command
#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = 3000, env = "TRACKERLINK_PORT")]
    pub port: u16,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0", env = "TRACKERLINK_HOST")]
    pub host: String,

    #[command(flatten)]
    pub backend_config: BackendArgs,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Arguments for the public-key command
#[derive(clap::Args, Debug)]
pub struct PublicKeyArgs {
    #[command(flatten)]
    pub backend_config: BackendArgs,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Arguments for the health command
#[derive(clap::Args, Debug)]
pub struct HealthArgs {
    /// Base URL of the server to check
    #[arg(long, default_value = "http://127.0.0.1:3000", env = "TRACKERLINK_URL")]
    pub url: String,

    /// Timeout in seconds
    #[arg(short, long, default_value_t = 5)]
    pub timeout: u64,
}
