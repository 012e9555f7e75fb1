//! ihub gateway - inter-cluster API gateway
//!
//! This is the main entry point for the gateway service.
//!
//! # Configuration
//!
//! The YAML configuration file is read from `IHUB_CONFIG` (default
//! `ihub-config.yaml`). `LISTEN_ADDR`, `DATA_DIR`, `RUNMODE` and `LOG_LEVEL`
//! override the corresponding settings. The `tables` section is reloaded
//! whenever the file changes.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ihub_auth::HttpValidationClient;
use ihub_gateway::{create_router, GatewayConfig, GatewayState, SeedFile, TablesWatcher};
use ihub_policy::TablesHandle;
use ihub_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (config, config_path) = GatewayConfig::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ihub gateway");
    tracing::info!(
        listen_addr = %config.listen_addr,
        runmode = %config.runmode,
        data_dir = %config.data_dir.display(),
        config_path = %config_path.display(),
        identity = config.identity.is_some(),
        "Gateway configuration loaded"
    );

    // Initialize RocksDB store
    tracing::info!(path = %config.data_dir.display(), "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&config.data_dir)?);

    if let Some(seed_path) = &config.seed_file {
        tracing::info!(path = %seed_path.display(), "Applying seed file");
        SeedFile::load(seed_path)?.apply(store.as_ref())?;
    }

    // Static tables, reloaded on change
    let tables = Arc::new(TablesHandle::new(config.tables.clone()));
    if config_path.exists() {
        TablesWatcher::new(Arc::clone(&tables), config_path).spawn();
    } else {
        tracing::warn!("No configuration file to watch - tables will not be reloaded");
    }

    let validator = Arc::new(HttpValidationClient::new(config.request_timeout()));
    let listen_addr = config.listen_addr.clone();
    let state = GatewayState::new(store, validator, tables, config);

    let app = create_router(state);
    tracing::info!("Router configured");

    // Start HTTP server
    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
