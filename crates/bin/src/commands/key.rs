//! Public key command - prints the PEM key the tracker should trust.
//!
//! Creates the keypair on first use exactly as the server would, so running
//! this before `serve` and registering the output with the tracker is safe.

use trackerlink::KeyStore;

use crate::backend::{INMEMORY_FILE, create_backend, data_dir, load_config};
use crate::cli::PublicKeyArgs;

/// Run the public-key command
pub async fn run(args: &PublicKeyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config, 3000).await?;
    let backend = create_backend(&args.backend_config).await?;

    let keys = KeyStore::with_key_bits(backend.clone(), config.key_bits);
    let pem = keys.ensure_keypair().await?.public_key_pem()?;

    let json_path = data_dir(&args.backend_config).join(INMEMORY_FILE);
    crate::commands::serve::persist_in_memory(backend.as_ref(), &json_path).await;

    print!("{pem}");
    Ok(())
}
