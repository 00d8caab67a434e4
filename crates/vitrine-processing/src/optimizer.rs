//! Rendition generation for accepted uploads.
//!
//! One source image becomes eight stored artifacts: four size tiers, each
//! encoded as JPEG and WebP. The full set is written through [`Storage`]
//! before a [`ProductImage`] is built, so a partially encoded image never
//! reaches the collection.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use sha2::{Digest, Sha256};
use uuid::Uuid;
use vitrine_core::{ProductImage, Rendition, RenditionFormat, RenditionTier, SourceFormat};
use vitrine_storage::{rendition_storage_key, Storage};

use crate::codec::ImageCodec;
use crate::presets::QualityPreset;

/// Failure while optimizing a single file. Carries the original filename
/// so the response assembler can prefix the per-file error message.
#[derive(Debug, thiserror::Error)]
#[error("{filename}: {reason}")]
pub struct OptimizationError {
    pub filename: String,
    pub reason: String,
}

impl OptimizationError {
    fn new(filename: &str, reason: impl Into<String>) -> Self {
        OptimizationError {
            filename: filename.to_string(),
            reason: reason.into(),
        }
    }
}

/// Generates and stores the fixed rendition set for one validated upload.
pub struct ImageOptimizer {
    storage: Arc<dyn Storage>,
    codec: Arc<dyn ImageCodec>,
}

struct EncodedSet {
    width: u32,
    height: u32,
    source_format: SourceFormat,
    artifacts: Vec<(RenditionTier, RenditionFormat, Bytes)>,
}

impl ImageOptimizer {
    pub fn new(storage: Arc<dyn Storage>, codec: Arc<dyn ImageCodec>) -> Self {
        Self { storage, codec }
    }

    /// Optimize one source image into its eight renditions and persist them.
    ///
    /// `display_order` is the image's final position in the product's
    /// collection; the caller computes it from the batch and the existing
    /// collection length.
    pub async fn optimize(
        &self,
        data: &[u8],
        product_id: &str,
        original_filename: &str,
        display_order: u32,
    ) -> Result<ProductImage, OptimizationError> {
        let start = Instant::now();
        let original_size_bytes = data.len() as u64;
        let checksum_sha256 = hex::encode(Sha256::digest(data));

        let codec = Arc::clone(&self.codec);
        let owned = data.to_vec();
        // Decode, resize and encode are CPU-bound; run off the async pool.
        let encoded = tokio::task::spawn_blocking(move || encode_all_renditions(&*codec, &owned))
            .await
            .map_err(|e| OptimizationError::new(original_filename, e.to_string()))?
            .map_err(|reason| OptimizationError::new(original_filename, reason))?;

        let image_id = Uuid::new_v4();
        let mut renditions = Vec::with_capacity(encoded.artifacts.len());
        let mut stored_keys = Vec::with_capacity(encoded.artifacts.len());

        for (tier, format, payload) in &encoded.artifacts {
            let storage_key = rendition_storage_key(product_id, image_id, *tier, *format);
            let size_bytes = payload.len() as u64;

            let url = match self
                .storage
                .upload_with_key(&storage_key, payload.to_vec(), format.content_type())
                .await
            {
                Ok(url) => url,
                Err(e) => {
                    self.rollback(&stored_keys).await;
                    return Err(OptimizationError::new(
                        original_filename,
                        format!("Failed to store rendition {}: {}", storage_key, e),
                    ));
                }
            };

            stored_keys.push(storage_key.clone());
            renditions.push(Rendition {
                tier: *tier,
                format: *format,
                storage_key,
                url,
                size_bytes,
            });
        }

        let processing_duration_ms = start.elapsed().as_millis() as u64;

        let image = ProductImage::new(
            image_id,
            product_id.to_string(),
            original_filename.to_string(),
            renditions,
            original_size_bytes,
            encoded.width,
            encoded.height,
            encoded.source_format,
            checksum_sha256,
            display_order,
            processing_duration_ms,
        )
        .map_err(|e| OptimizationError::new(original_filename, e.to_string()))?;

        tracing::info!(
            product_id = %product_id,
            image_id = %image_id,
            filename = %original_filename,
            original_bytes = image.original_size_bytes,
            optimized_bytes = image.optimized_size_bytes,
            duration_ms = processing_duration_ms,
            "Optimized product image"
        );

        Ok(image)
    }

    /// Remove already-stored renditions after a mid-set failure so storage
    /// never holds a partial artifact set. Failures here are logged only.
    async fn rollback(&self, stored_keys: &[String]) {
        for key in stored_keys {
            if let Err(e) = self.storage.delete(key).await {
                tracing::warn!(
                    key = %key,
                    error = %e,
                    "Failed to remove rendition during rollback"
                );
            }
        }
    }
}

fn encode_all_renditions(codec: &dyn ImageCodec, data: &[u8]) -> Result<EncodedSet, String> {
    let decoded = codec.decode(data).map_err(|e| e.to_string())?;
    let (width, height) = decoded.image.dimensions();

    let mut artifacts = Vec::with_capacity(RenditionTier::ALL.len() * RenditionFormat::ALL.len());
    for tier in RenditionTier::ALL {
        let resized = resize_for_tier(&decoded.image, tier);
        let quality = QualityPreset::for_tier(tier);
        for format in RenditionFormat::ALL {
            let payload = codec
                .encode(&resized, format, quality)
                .map_err(|e| e.to_string())?;
            artifacts.push((tier, format, payload));
        }
    }

    Ok(EncodedSet {
        width,
        height,
        source_format: decoded.format,
        artifacts,
    })
}

/// Fit the image inside the tier's bounding box, keeping aspect ratio.
/// Images already inside the box are kept as-is; renditions never upscale.
fn resize_for_tier(image: &DynamicImage, tier: RenditionTier) -> DynamicImage {
    let (max_width, max_height) = tier.max_dimensions();
    let (width, height) = image.dimensions();

    if width <= max_width && height <= max_height {
        image.clone()
    } else {
        image.resize(max_width, max_height, FilterType::Lanczos3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecError, DecodedImage, ImageInfo};
    use async_trait::async_trait;
    use tempfile::tempdir;
    use vitrine_core::RENDITION_COUNT;
    use vitrine_storage::{LocalStorage, StorageError, StorageResult};

    /// Deterministic codec double: fixed dimensions, fixed payload sizes.
    struct FakeCodec;

    impl ImageCodec for FakeCodec {
        fn probe(&self, _data: &[u8]) -> Result<ImageInfo, CodecError> {
            Ok(ImageInfo {
                width: 640,
                height: 480,
                format: SourceFormat::Png,
            })
        }

        fn decode(&self, _data: &[u8]) -> Result<DecodedImage, CodecError> {
            Ok(DecodedImage {
                image: DynamicImage::new_rgba8(640, 480),
                format: SourceFormat::Png,
            })
        }

        fn encode(
            &self,
            _image: &DynamicImage,
            format: RenditionFormat,
            _quality: QualityPreset,
        ) -> Result<Bytes, CodecError> {
            let size = match format {
                RenditionFormat::Jpeg => 300,
                RenditionFormat::Webp => 200,
            };
            Ok(Bytes::from(vec![0u8; size]))
        }
    }

    /// Codec double that fails every encode.
    struct BrokenCodec;

    impl ImageCodec for BrokenCodec {
        fn probe(&self, _data: &[u8]) -> Result<ImageInfo, CodecError> {
            Ok(ImageInfo {
                width: 1,
                height: 1,
                format: SourceFormat::Jpeg,
            })
        }

        fn decode(&self, _data: &[u8]) -> Result<DecodedImage, CodecError> {
            Ok(DecodedImage {
                image: DynamicImage::new_rgba8(1, 1),
                format: SourceFormat::Jpeg,
            })
        }

        fn encode(
            &self,
            _image: &DynamicImage,
            _format: RenditionFormat,
            _quality: QualityPreset,
        ) -> Result<Bytes, CodecError> {
            Err(CodecError::Encode("simulated encoder failure".to_string()))
        }
    }

    /// Storage double that rejects every upload.
    struct FailingStorage;

    #[async_trait]
    impl Storage for FailingStorage {
        async fn upload_with_key(
            &self,
            _storage_key: &str,
            _data: Vec<u8>,
            _content_type: &str,
        ) -> StorageResult<String> {
            Err(StorageError::UploadFailed("disk full".to_string()))
        }

        async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
            Err(StorageError::NotFound(storage_key.to_string()))
        }

        async fn delete(&self, _storage_key: &str) -> StorageResult<()> {
            Ok(())
        }

        async fn exists(&self, _storage_key: &str) -> StorageResult<bool> {
            Ok(false)
        }
    }

    async fn local_optimizer(dir: &tempfile::TempDir) -> ImageOptimizer {
        let storage = LocalStorage::new(dir.path(), "http://localhost:4000/media".to_string())
            .await
            .unwrap();
        ImageOptimizer::new(Arc::new(storage), Arc::new(FakeCodec))
    }

    #[tokio::test]
    async fn test_optimize_produces_full_rendition_set() {
        let dir = tempdir().unwrap();
        let optimizer = local_optimizer(&dir).await;

        let image = optimizer
            .optimize(b"source bytes", "prod-7", "hero.png", 2)
            .await
            .unwrap();

        assert_eq!(image.renditions.len(), RENDITION_COUNT);
        assert_eq!(image.product_id, "prod-7");
        assert_eq!(image.original_filename, "hero.png");
        assert_eq!(image.display_order, 2);
        assert_eq!(image.width, 640);
        assert_eq!(image.height, 480);
        assert_eq!(image.source_format, SourceFormat::Png);
        // 4 tiers x (300-byte JPEG + 200-byte WebP)
        assert_eq!(image.optimized_size_bytes, 2000);

        for rendition in &image.renditions {
            let on_disk = dir.path().join(&rendition.storage_key);
            assert!(on_disk.exists(), "missing artifact {}", rendition.storage_key);
            assert!(rendition.url.starts_with("http://localhost:4000/media/"));
        }
    }

    #[tokio::test]
    async fn test_optimize_records_source_checksum() {
        let dir = tempdir().unwrap();
        let optimizer = local_optimizer(&dir).await;

        let data = b"deterministic source";
        let image = optimizer
            .optimize(data, "p1", "a.png", 0)
            .await
            .unwrap();

        let expected = hex::encode(Sha256::digest(data));
        assert_eq!(image.checksum_sha256, expected);
        assert_eq!(image.original_size_bytes, data.len() as u64);
    }

    #[tokio::test]
    async fn test_encode_failure_carries_filename() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost:4000/media".to_string())
            .await
            .unwrap();
        let optimizer = ImageOptimizer::new(Arc::new(storage), Arc::new(BrokenCodec));

        let err = optimizer
            .optimize(b"bytes", "p1", "broken.jpg", 0)
            .await
            .unwrap_err();

        assert_eq!(err.filename, "broken.jpg");
        assert!(err.reason.contains("simulated encoder failure"));
    }

    #[tokio::test]
    async fn test_storage_failure_carries_filename() {
        let optimizer = ImageOptimizer::new(Arc::new(FailingStorage), Arc::new(FakeCodec));

        let err = optimizer
            .optimize(b"bytes", "p1", "hero.png", 0)
            .await
            .unwrap_err();

        assert_eq!(err.filename, "hero.png");
        assert!(err.reason.contains("disk full"));
    }

    #[test]
    fn test_resize_never_upscales() {
        let small = DynamicImage::new_rgba8(100, 100);
        let resized = resize_for_tier(&small, RenditionTier::Large);
        assert_eq!(resized.dimensions(), (100, 100));
    }

    #[test]
    fn test_resize_fits_bounding_box_keeping_aspect() {
        let wide = DynamicImage::new_rgba8(3000, 1500);
        let resized = resize_for_tier(&wide, RenditionTier::Original);
        assert_eq!(resized.dimensions(), (1920, 960));
    }
}
