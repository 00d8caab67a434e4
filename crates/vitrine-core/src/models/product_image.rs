use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

/// Number of renditions every optimized image carries
/// (4 tiers, each encoded as JPEG and WebP).
pub const RENDITION_COUNT: usize = 8;

/// Detected format of the uploaded source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Jpeg,
    Png,
    Webp,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Jpeg => "jpeg",
            SourceFormat::Png => "png",
            SourceFormat::Webp => "webp",
        }
    }
}

/// Size tier of a generated rendition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RenditionTier {
    Thumbnail,
    Medium,
    Large,
    /// Source image normalized to a bounded size, keeping aspect ratio.
    Original,
}

impl RenditionTier {
    pub const ALL: [RenditionTier; 4] = [
        RenditionTier::Thumbnail,
        RenditionTier::Medium,
        RenditionTier::Large,
        RenditionTier::Original,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RenditionTier::Thumbnail => "thumbnail",
            RenditionTier::Medium => "medium",
            RenditionTier::Large => "large",
            RenditionTier::Original => "original",
        }
    }

    /// Bounding box the rendition is resized to fit within.
    pub fn max_dimensions(&self) -> (u32, u32) {
        match self {
            RenditionTier::Thumbnail => (150, 150),
            RenditionTier::Medium => (400, 400),
            RenditionTier::Large => (800, 800),
            RenditionTier::Original => (1920, 1920),
        }
    }
}

/// Output encoding of a generated rendition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RenditionFormat {
    /// Legacy raster fallback.
    Jpeg,
    /// Modern format for capable clients.
    Webp,
}

impl RenditionFormat {
    pub const ALL: [RenditionFormat; 2] = [RenditionFormat::Jpeg, RenditionFormat::Webp];

    pub fn extension(&self) -> &'static str {
        match self {
            RenditionFormat::Jpeg => "jpg",
            RenditionFormat::Webp => "webp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            RenditionFormat::Jpeg => "image/jpeg",
            RenditionFormat::Webp => "image/webp",
        }
    }
}

/// A single stored rendition of a product image
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rendition {
    pub tier: RenditionTier,
    pub format: RenditionFormat,
    /// Key of the stored artifact, relative to the storage root.
    pub storage_key: String,
    /// Publicly served URL of the artifact.
    pub url: String,
    pub size_bytes: u64,
}

/// An optimized product image and its stored rendition set.
///
/// Immutable after creation. The rendition set is complete (all tier/format
/// combinations present) or the value is never constructed; a partially
/// encoded image is not representable.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    pub id: Uuid,
    pub product_id: String,
    pub original_filename: String,
    pub renditions: Vec<Rendition>,
    pub original_size_bytes: u64,
    /// Sum of all rendition payload sizes.
    pub optimized_size_bytes: u64,
    pub width: u32,
    pub height: u32,
    pub source_format: SourceFormat,
    /// Hex SHA-256 of the source bytes, kept for auditing.
    pub checksum_sha256: String,
    pub uploaded_at: DateTime<Utc>,
    pub display_order: u32,
    pub compression_ratio: f64,
    pub processing_duration_ms: u64,
}

impl ProductImage {
    /// Build a product image, enforcing the complete-rendition-set invariant.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Uuid,
        product_id: String,
        original_filename: String,
        renditions: Vec<Rendition>,
        original_size_bytes: u64,
        width: u32,
        height: u32,
        source_format: SourceFormat,
        checksum_sha256: String,
        display_order: u32,
        processing_duration_ms: u64,
    ) -> Result<Self, AppError> {
        if renditions.len() != RENDITION_COUNT {
            return Err(AppError::Internal(format!(
                "Incomplete rendition set: expected {}, got {}",
                RENDITION_COUNT,
                renditions.len()
            )));
        }
        for tier in RenditionTier::ALL {
            for format in RenditionFormat::ALL {
                if !renditions
                    .iter()
                    .any(|r| r.tier == tier && r.format == format)
                {
                    return Err(AppError::Internal(format!(
                        "Missing rendition {}.{}",
                        tier.as_str(),
                        format.extension()
                    )));
                }
            }
        }

        let optimized_size_bytes: u64 = renditions.iter().map(|r| r.size_bytes).sum();
        let compression_ratio = if original_size_bytes > 0 {
            (original_size_bytes as f64 - optimized_size_bytes as f64)
                / original_size_bytes as f64
        } else {
            0.0
        };

        Ok(ProductImage {
            id,
            product_id,
            original_filename,
            renditions,
            original_size_bytes,
            optimized_size_bytes,
            width,
            height,
            source_format,
            checksum_sha256,
            uploaded_at: Utc::now(),
            display_order,
            compression_ratio,
            processing_duration_ms,
        })
    }

    /// Look up a stored rendition by tier and format.
    pub fn rendition(&self, tier: RenditionTier, format: RenditionFormat) -> Option<&Rendition> {
        self.renditions
            .iter()
            .find(|r| r.tier == tier && r.format == format)
    }
}
