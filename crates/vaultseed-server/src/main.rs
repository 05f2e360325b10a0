//! VaultSeed Server Binary
//!
//! Runs the VaultSeed HTTP server.

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use vaultseed_core::KeyPair;
use vaultseed_server::{create_router, AppState, KeyRegistry, MemoryStore, ServerConfig, VaultStore};

#[tokio::main]
async fn main() {
    let config = ServerConfig::from_env().expect("Invalid configuration");

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_target(true)
        .with_thread_ids(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    // Initialize key registry
    let key_pair = match &config.credential_key {
        Some(seed) => KeyPair::from_hex(&config.credential_kid, seed)
            .expect("VAULTSEED_CREDENTIAL_KEY must be a 32-byte hex seed"),
        None => KeyPair::generate(&config.credential_kid),
    };
    let registry = KeyRegistry::new(key_pair);

    // Initialize storage
    let store = open_store(&config).await;

    info!(
        credential_kid = %registry.kid(),
        retired_keys = config.retired_keys.len(),
        service = %config.service_name,
        port = config.port,
        "Starting VaultSeed server"
    );

    let addr = config.listen_addr();
    let state = Arc::new(AppState::new(config, store, registry));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    info!(addr = %addr, "VaultSeed listening");

    axum::serve(listener, app).await.expect("Server error");
}

#[cfg(feature = "postgres")]
async fn open_store(config: &ServerConfig) -> Arc<dyn VaultStore> {
    match &config.database_url {
        Some(url) => Arc::new(
            vaultseed_server::PostgresStore::new(url)
                .await
                .expect("Failed to connect to PostgreSQL"),
        ),
        None => Arc::new(MemoryStore::new()),
    }
}

#[cfg(not(feature = "postgres"))]
async fn open_store(config: &ServerConfig) -> Arc<dyn VaultStore> {
    if config.database_url.is_some() {
        tracing::warn!("VAULTSEED_DATABASE_URL is set but postgres support is not compiled in");
    }
    Arc::new(MemoryStore::new())
}
