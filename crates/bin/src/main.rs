//! The trackerlink server binary.

mod backend;
mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing; RUST_LOG directives are added on top of the default
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("trackerlink=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Serve(args) => commands::serve::run(args).await,
        Commands::PublicKey(args) => commands::key::run(args).await,
        Commands::Health(args) => commands::health::run(args).await,
    }
}
