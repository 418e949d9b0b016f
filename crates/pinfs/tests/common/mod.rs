//! Shared test utilities for client integration tests
#![allow(dead_code)]

use std::sync::Arc;

use pinfs::client::Client;
use pinfs::node::NodeRegistry;
use pinfs::pin::MemoryPinService;
use tempfile::TempDir;

pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// Set up a client over a fresh registry with an in-memory pin
/// service and an empty root installed.
pub async fn setup_client() -> (Client, Arc<MemoryPinService>, Arc<NodeRegistry>, TempDir) {
    init_tracing();
    let temp = TempDir::new().unwrap();
    let registry = Arc::new(NodeRegistry::new(temp.path()));
    let pins = Arc::new(MemoryPinService::new());

    let client = Client::acquire_with(registry.clone(), pins.clone())
        .await
        .unwrap();
    client.init_root().await.unwrap();

    (client, pins, registry, temp)
}

/// Set up a client with no root installed, for resolution tests.
pub async fn setup_bare_client() -> (Client, Arc<MemoryPinService>, Arc<NodeRegistry>, TempDir) {
    init_tracing();
    let temp = TempDir::new().unwrap();
    let registry = Arc::new(NodeRegistry::new(temp.path()));
    let pins = Arc::new(MemoryPinService::new());

    let client = Client::acquire_with(registry.clone(), pins.clone())
        .await
        .unwrap();

    (client, pins, registry, temp)
}
