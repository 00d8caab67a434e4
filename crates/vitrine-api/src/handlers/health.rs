//! Health check handler.

use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub storage: String,
}

/// Service health
///
/// Probes the storage backend; a reachable storage root reports `healthy`
/// even when the probe key itself does not exist.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Storage unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(state: Arc<AppState>) -> impl IntoResponse {
    const TIMEOUT: Duration = Duration::from_secs(5);

    let storage = match tokio::time::timeout(TIMEOUT, state.storage.exists("health/probe")).await {
        Ok(Ok(_)) => "healthy".to_string(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Storage health check failed");
            format!("unhealthy: {}", e)
        }
        Err(_) => {
            tracing::error!("Storage health check timed out");
            "timeout".to_string()
        }
    };

    let healthy = storage == "healthy";
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if healthy { "ok" } else { "degraded" }.to_string(),
            storage,
        }),
    )
}
