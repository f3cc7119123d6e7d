//! Serve command - runs the trackerlink web server.

use std::path::Path;

use tokio::signal::unix::{SignalKind, signal};

use trackerlink::{
    backend::{Backend, InMemory},
    constants::{
        ROUTE_HEALTH, ROUTE_OAUTH1_COMPLETE, ROUTE_OAUTH1_PUBLIC_KEY, ROUTE_USER_CONNECT,
        ROUTE_USER_DISCONNECT, ROUTE_USER_INFO,
    },
    web::{self, AppState},
};

use crate::backend::{INMEMORY_FILE, create_backend, data_dir, load_config};
use crate::cli::ServeArgs;

/// Run the trackerlink server
pub async fn run(args: &ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config, args.port).await?;

    // Create the storage backend
    let backend = create_backend(&args.backend_config).await?;

    let state = AppState::from_config(&config, backend.clone()).await?;

    // Create the trust keypair up front so the first admin request is fast
    state.keys.ensure_keypair().await?;

    let app = web::router(state);

    // Bind server
    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(%local_addr, public_url = %config.public_url, "trackerlink server started");

    // Print startup message
    println!("trackerlink server listening on http://{local_addr}");
    println!("Public URL: {}", config.public_url);
    println!();
    println!("Available endpoints:");
    println!("  GET  {ROUTE_USER_CONNECT}    - Start connecting a tracker account");
    println!("  GET  {ROUTE_OAUTH1_COMPLETE}  - Tracker redirect back after approval");
    println!("  GET  {ROUTE_OAUTH1_PUBLIC_KEY} - PEM public key (administrators)");
    println!("  POST {ROUTE_USER_DISCONNECT}  - Disconnect the tracker account");
    println!("  GET  {ROUTE_USER_INFO}  - Connection status");
    println!("  GET  {ROUTE_HEALTH}           - Health check");
    println!();
    println!("Press Ctrl+C to shutdown");

    let json_path = data_dir(&args.backend_config).join(INMEMORY_FILE);

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            persist_in_memory(backend.as_ref(), &json_path).await;
        })
        .await?;

    println!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!("Failed to set up signal handlers: {e}");
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating graceful shutdown..."),
        _ = sigint.recv() => tracing::info!("Received SIGINT, initiating graceful shutdown..."),
    }
}

/// Saves an `InMemory` backend to `json_path`; other backends are already
/// durable.
pub async fn persist_in_memory(backend: &dyn Backend, json_path: &Path) {
    let Some(in_memory_backend) = backend.as_any().downcast_ref::<InMemory>() else {
        return;
    };

    match in_memory_backend.save_to_file(json_path).await {
        Ok(()) => tracing::info!("Database saved to {}", json_path.display()),
        Err(e) => {
            tracing::error!("Failed to save database: {e:?}");
            eprintln!("Failed to save database: {e:?}");
        }
    }
}
