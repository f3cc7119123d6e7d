/*! Integration tests for trackerlink.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - backend: Tests for the Backend trait against every implementation
 * - store: Tests for the one-time secret and user link stores
 * - keys: Tests for the KeyStore's first-writer-wins keypair
 * - instance: Tests for Server/Cloud instances and the registry, against a mock tracker
 * - handshake: End-to-end handshake, disconnect and user info flows
 * - web: Tests for the HTTP endpoints through the axum router
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("trackerlink=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod backend;
mod helpers;
mod store;
mod web;
