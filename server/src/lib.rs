pub mod api;
pub mod config;
pub mod error;

use std::sync::Arc;

use itrack_core::error::AppError;
use itrack_core::store::Store;

use crate::api::{build_router, AppState};
use crate::config::Config;

/// Open the store, optionally seed it, and serve HTTP until Ctrl-C.
pub async fn run(config: Config) -> Result<(), AppError> {
    let store = Store::open_with_timeout(&config.database.path, config.database.busy_timeout())?;

    if config.seed.enabled {
        let count = store.seed_demo(config.seed.count)?;
        tracing::info!(count, "replaced incidents with demo data");
    }

    let store = Arc::new(store);
    let router = build_router(
        AppState::new(store.clone()),
        &config.server.api_prefix,
        config.ui.static_dir.as_deref(),
    );

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        AppError::config("SERVER_BIND_FAILED", format!("Failed to bind {addr}"))
            .with_details(e.to_string())
    })?;
    tracing::info!(%addr, api_prefix = %config.server.api_prefix, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            AppError::config("SERVER_FAILED", "HTTP server stopped unexpectedly")
                .with_details(e.to_string())
        })?;

    match Arc::try_unwrap(store) {
        Ok(store) => store.close()?,
        Err(_) => tracing::warn!("store still shared at shutdown; skipping checkpoint"),
    }
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
