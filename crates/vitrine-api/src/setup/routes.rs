//! Route configuration and setup.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::get,
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use vitrine_core::Config;

use crate::auth::{auth_middleware, AuthState};
use crate::handlers;
use crate::state::AppState;

/// Multipart framing allowance on top of the batch payload ceiling, so a
/// maximal batch is not cut off by its own boundaries and part headers.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;
    let auth_state = Arc::new(AuthState {
        admin_api_keys: config.admin_api_keys.clone(),
    });

    let public_routes = public_routes(state.clone());

    let admin_routes = admin_routes().layer(axum::middleware::from_fn_with_state(
        auth_state,
        auth_middleware,
    ));

    let app = public_routes
        .merge(admin_routes)
        // The tower-http limit is authoritative; axum's per-extractor
        // default would reject large batches before it applies.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(
            config.max_batch_size_bytes + MULTIPART_OVERHEAD_BYTES,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Public routes (no authentication required)
fn public_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/health",
            get({
                let state = state.clone();
                move || {
                    let state = state.clone();
                    async { handlers::health::health_check(state).await }
                }
            }),
        )
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
}

/// Admin routes (require a configured API key)
fn admin_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/admin/products/{product_id}/images",
        get(handlers::product_images::list_product_images)
            .post(handlers::product_images::upload_product_images)
            .put(handlers::product_images::reorder_product_images)
            .delete(handlers::product_images::delete_product_image),
    )
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            config.cors_origins.iter().map(|o| o.parse()).collect();

        CorsLayer::new()
            .allow_origin(origins.unwrap_or_default())
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers(Any)
    };
    Ok(cors)
}
