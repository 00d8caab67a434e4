//! Admin bearer authentication for the back-office routes.
//!
//! Every `/api/admin` route requires `Authorization: Bearer <key>` where the
//! key is one of the configured admin keys. Comparison is constant-time so
//! response timing leaks nothing about key prefixes.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use vitrine_core::AppError;

use crate::error::HttpAppError;

#[derive(Clone)]
pub struct AuthState {
    pub admin_api_keys: Vec<String>,
}

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            return HttpAppError(AppError::Unauthorized(
                "Missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return HttpAppError(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        ))
        .into_response();
    };

    // Check every configured key so timing does not depend on which key
    // (if any) matched.
    let mut authorized = false;
    for key in &auth_state.admin_api_keys {
        authorized |= secure_compare(token, key);
    }

    if !authorized {
        tracing::warn!("Rejected request with invalid admin API key");
        return HttpAppError(AppError::Unauthorized("Invalid API key".to_string()))
            .into_response();
    }

    next.run(request).await
}
