//! eSIM Shop Service - HTTP API for the eSIM storefront
//!
//! This is the main entry point for the esim-shop service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use esim_shop_service::{create_router, AppState, ServiceConfig, StorageBackend};
use esim_shop_store::{MemoryStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,esim_shop=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting eSIM Shop Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        storage_backend = ?config.storage_backend,
        seed_demo_payment_methods = config.seed_demo_payment_methods,
        order_processing_latency_ms = config.order_processing_latency_ms,
        "Service configuration loaded"
    );

    let store = open_store(&config)?;

    // Build app state
    let state = AppState::new(store, config.clone());
    let orders = state.orders.clone();

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received");
            orders.shutdown();
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    match config.storage_backend {
        #[cfg(feature = "rocksdb-backend")]
        StorageBackend::RocksDb => {
            tracing::info!(path = %config.data_dir, "Opening RocksDB store");
            Ok(Arc::new(esim_shop_store::RocksStore::open(&config.data_dir)?))
        }
        #[cfg(not(feature = "rocksdb-backend"))]
        StorageBackend::RocksDb => {
            Err("RocksDB backend not compiled in; set STORAGE_BACKEND=memory".into())
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory store - data will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
