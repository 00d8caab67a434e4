//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use vitrine_core::models;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vitrine API",
        version = "0.1.0",
        description = "Product image ingestion service. Uploads are validated, optimized into four sizes in JPEG and WebP, and tracked per product in display order. All /api/admin routes require an admin API key."
    ),
    paths(
        handlers::product_images::upload_product_images,
        handlers::product_images::list_product_images,
        handlers::product_images::reorder_product_images,
        handlers::product_images::delete_product_image,
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::ProductImage,
            models::Rendition,
            models::RenditionTier,
            models::RenditionFormat,
            models::SourceFormat,
            handlers::product_images::UploadResponse,
            handlers::product_images::ListImagesResponse,
            handlers::product_images::ActionResponse,
            handlers::product_images::ReorderRequest,
            handlers::health::HealthResponse,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "product-images", description = "Product image collection management"),
        (name = "health", description = "Service health probes")
    )
)]
pub struct ApiDoc;
