//! Application setup and initialization.
//!
//! Wiring lives here instead of main.rs so integration tests can build the
//! same router against scratch directories.

pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use vitrine_core::Config;
use vitrine_processing::ImageRsCodec;
use vitrine_storage::{LocalStorage, TempStore};

use crate::middleware::rate_limit::UploadRateLimiter;
use crate::repository::InMemoryCollectionRepository;
use crate::services::upload::UploadService;
use crate::state::AppState;

/// Initialize the entire application: storage, services, routes.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_telemetry();
    tracing::info!("Configuration loaded and validated successfully");

    let state = build_state(config).await?;

    // Expired rate-limit buckets are reaped every 5 minutes.
    state.rate_limiter.spawn_cleanup_task(300);

    let router = routes::setup_routes(&state.config, state.clone())?;

    Ok((state, router))
}

/// Build the shared state without spawning background tasks. Used directly
/// by tests that want a router with no cleanup timer running.
pub async fn build_state(config: Config) -> Result<Arc<AppState>> {
    let media_base_url = std::env::var("MEDIA_BASE_URL")
        .unwrap_or_else(|_| format!("http://localhost:{}/media", config.server_port));

    let storage = Arc::new(
        LocalStorage::new(config.storage_root.clone(), media_base_url)
            .await
            .context("Failed to initialize rendition storage")?,
    );
    let temp_store = TempStore::new(config.temp_dir.clone())
        .await
        .context("Failed to initialize temp store")?;

    let codec = Arc::new(ImageRsCodec::new());
    let repository = Arc::new(InMemoryCollectionRepository::new());

    let upload_service = Arc::new(UploadService::new(
        &config,
        codec,
        storage.clone(),
        temp_store,
        repository.clone(),
    ));

    let rate_limiter = Arc::new(UploadRateLimiter::new(
        config.upload_rate_limit_per_minute,
        config.rate_limit_window_secs,
        config.rate_limit_max_clients,
    ));

    Ok(Arc::new(AppState {
        config,
        storage,
        repository,
        upload_service,
        rate_limiter,
    }))
}
