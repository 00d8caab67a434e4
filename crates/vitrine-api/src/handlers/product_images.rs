//! Back-office product image endpoints.
//!
//! Four routes under `/api/admin/products/{product_id}/images`: upload a
//! multipart batch, list the collection, replace the display order, delete
//! one image. Domain failures (bad batch, bad order list, unknown image)
//! answer with the `{ success, message }` shape and a 400; the
//! [`HttpAppError`] envelope is reserved for auth failures, malformed JSON
//! and unexpected errors.

use std::sync::Arc;

use axum::{
    extract::{
        multipart::MultipartRejection, Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use vitrine_core::{AppError, ProductImage};

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::upload::{BatchError, UploadedFile};
use crate::state::AppState;
use crate::utils::ip_extraction::ClientIp;

/// Body of a processed upload batch. `images` and `errors` are omitted when
/// empty so an all-success response carries no `errors` key and vice versa.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ProductImage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListImagesResponse {
    pub success: bool,
    pub images: Vec<ProductImage>,
}

/// Shared `{ success, message }` shape for reorder, delete and domain-level
/// upload rejections.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReorderRequest {
    #[serde(rename = "imageOrder")]
    pub image_order: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    #[serde(rename = "imageId")]
    pub image_id: Option<String>,
}

fn domain_rejection(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ActionResponse {
            success: false,
            message: message.into(),
        }),
    )
        .into_response()
}

/// Upload a batch of product images
///
/// Accepts up to 8 files in the repeated multipart field `images`. Files are
/// validated and optimized independently; the response reports per-file
/// failures alongside the successes.
#[utoipa::path(
    post,
    path = "/api/admin/products/{product_id}/images",
    tag = "product-images",
    params(
        ("product_id" = String, Path, description = "Product whose collection receives the images")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Batch processed (possibly with per-file failures)", body = UploadResponse),
        (status = 400, description = "Batch rejected before processing", body = ActionResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 429, description = "Upload rate limit exceeded", body = ActionResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_product_images"))]
pub async fn upload_product_images(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
    ClientIp(client_ip): ClientIp,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, HttpAppError> {
    // Admission gates run in a fixed order: product id, rate limit,
    // content type, then the file-count checks inside the service.
    let product_id = product_id.trim().to_string();
    if product_id.is_empty() {
        return Ok(domain_rejection("Product ID is required"));
    }

    let bucket_key = format!("ip:{}", client_ip);
    let remaining = match state.rate_limiter.check_rate_limit(&bucket_key).await {
        Ok(remaining) => remaining,
        Err(retry_after) => {
            let secs = retry_after.as_secs().max(1);
            tracing::warn!(client_ip = %client_ip, "Upload rate limit exceeded");
            return Ok((
                StatusCode::TOO_MANY_REQUESTS,
                [
                    ("Retry-After", secs.to_string()),
                    ("X-RateLimit-Limit", state.rate_limiter.limit().to_string()),
                    ("X-RateLimit-Remaining", "0".to_string()),
                ],
                Json(ActionResponse {
                    success: false,
                    message: format!("Too many upload requests. Retry in {} seconds", secs),
                }),
            )
                .into_response());
        }
    };

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(_) => return Ok(domain_rejection("Request must be multipart/form-data")),
    };

    let mut files: Vec<UploadedFile> = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(_) => return Ok(domain_rejection("Failed to read multipart body")),
        };
        if field.name() != Some("images") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "file".to_string());
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(_) => return Ok(domain_rejection("Failed to read multipart body")),
        };

        files.push(UploadedFile {
            filename,
            content_type,
            data,
        });
    }

    let summary = match state.upload_service.process_batch(&product_id, files).await {
        Ok(summary) => summary,
        Err(BatchError::Rejected(message)) => return Ok(domain_rejection(message)),
        Err(BatchError::Internal(e)) => return Err(HttpAppError(e)),
    };

    let body = UploadResponse {
        success: summary.success,
        message: summary.message,
        images: (!summary.images.is_empty()).then_some(summary.images),
        errors: (!summary.errors.is_empty()).then_some(summary.errors),
    };

    Ok((
        StatusCode::OK,
        [
            ("X-RateLimit-Limit", state.rate_limiter.limit().to_string()),
            ("X-RateLimit-Remaining", remaining.to_string()),
        ],
        Json(body),
    )
        .into_response())
}

/// List a product's images
///
/// Returns the persisted collection in display order. Unknown products have
/// an empty collection rather than a 404.
#[utoipa::path(
    get,
    path = "/api/admin/products/{product_id}/images",
    tag = "product-images",
    params(
        ("product_id" = String, Path, description = "Product whose collection is listed")
    ),
    responses(
        (status = 200, description = "Collection in display order", body = ListImagesResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_product_images(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
) -> Result<Json<ListImagesResponse>, HttpAppError> {
    let images = state.repository.list(&product_id).await?;
    Ok(Json(ListImagesResponse {
        success: true,
        images,
    }))
}

/// Replace a product's display order
///
/// The body's `imageOrder` must be exactly a permutation of the current
/// collection's ids.
#[utoipa::path(
    put,
    path = "/api/admin/products/{product_id}/images",
    tag = "product-images",
    params(
        ("product_id" = String, Path, description = "Product whose collection is reordered")
    ),
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "Order updated", body = ActionResponse),
        (status = 400, description = "Order list is not a permutation of the collection", body = ActionResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn reorder_product_images(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
    ValidatedJson(request): ValidatedJson<ReorderRequest>,
) -> Result<Response, HttpAppError> {
    match state
        .repository
        .reorder(&product_id, &request.image_order)
        .await
    {
        Ok(()) => Ok((
            StatusCode::OK,
            Json(ActionResponse {
                success: true,
                message: "Image order updated successfully".to_string(),
            }),
        )
            .into_response()),
        Err(AppError::InvalidInput(message)) => Ok(domain_rejection(message)),
        Err(e) => Err(HttpAppError(e)),
    }
}

/// Delete one product image
///
/// Removes the collection entry and its stored renditions. The image must
/// belong to the product; unknown ids are rejected instead of silently
/// succeeding.
#[utoipa::path(
    delete,
    path = "/api/admin/products/{product_id}/images",
    tag = "product-images",
    params(
        ("product_id" = String, Path, description = "Product whose image is deleted"),
        ("imageId" = String, Query, description = "Id of the image to delete")
    ),
    responses(
        (status = 200, description = "Image deleted", body = ActionResponse),
        (status = 400, description = "Missing, malformed or unknown image id", body = ActionResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn delete_product_image(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<Response, HttpAppError> {
    let image_id = match params.image_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => return Ok(domain_rejection("Image ID is required")),
    };
    let image_id = match Uuid::parse_str(&image_id) {
        Ok(id) => id,
        Err(_) => return Ok(domain_rejection("Image ID must be a valid UUID")),
    };

    let removed = match state.repository.remove(&product_id, image_id).await {
        Ok(removed) => removed,
        Err(AppError::NotFound(_)) => {
            return Ok(domain_rejection("Image not found in product collection"));
        }
        Err(e) => return Err(HttpAppError(e)),
    };

    // Rendition files go best-effort; a stale object is preferable to a
    // collection entry pointing at deleted files.
    for rendition in &removed.renditions {
        if let Err(e) = state.storage.delete(&rendition.storage_key).await {
            tracing::warn!(
                storage_key = %rendition.storage_key,
                error = %e,
                "Failed to delete rendition file"
            );
        }
    }

    tracing::info!(
        product_id = %product_id,
        image_id = %image_id,
        "Deleted product image"
    );

    Ok((
        StatusCode::OK,
        Json(ActionResponse {
            success: true,
            message: "Image deleted successfully".to_string(),
        }),
    )
        .into_response())
}
