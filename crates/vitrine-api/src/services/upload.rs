//! Upload batch processing.
//!
//! One request carries up to eight files. Each file is validated and
//! optimized independently; failures stay per-file and are reported as
//! filename-prefixed strings in input order. The whole batch aborts only
//! when the accepted files together exceed the batch size limit. Temp
//! artifacts written during validation are removed before the batch result
//! is returned, whatever the outcome.

use std::sync::Arc;

use bytes::Bytes;
use vitrine_core::{constants, AppError, Config, ProductImage};
use vitrine_processing::{FileValidator, ImageCodec, ImageOptimizer};
use vitrine_storage::{Storage, TempFile, TempStore};

use crate::repository::CollectionRepository;

/// One file lifted out of the multipart body.
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Outcome of a processed batch. `images` and `errors` are both in input
/// order; `success` means at least one file made it through.
#[derive(Debug)]
pub struct BatchSummary {
    pub success: bool,
    pub message: String,
    pub images: Vec<ProductImage>,
    pub errors: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The whole request is rejected before or instead of per-file
    /// processing; rendered as a 400 with the message.
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Internal(#[from] AppError),
}

struct AcceptedFile {
    index: usize,
    filename: String,
    temp: TempFile,
}

/// Runs the per-file pipeline for one upload request.
pub struct UploadService {
    validator: FileValidator,
    codec: Arc<dyn ImageCodec>,
    optimizer: ImageOptimizer,
    temp_store: TempStore,
    repository: Arc<dyn CollectionRepository>,
    max_batch_size_bytes: usize,
    max_files_per_request: usize,
}

impl UploadService {
    pub fn new(
        config: &Config,
        codec: Arc<dyn ImageCodec>,
        storage: Arc<dyn Storage>,
        temp_store: TempStore,
        repository: Arc<dyn CollectionRepository>,
    ) -> Self {
        let validator = FileValidator::new(
            config.max_file_size_bytes,
            config.allowed_extensions.clone(),
            config.allowed_content_types.clone(),
            constants::SUGGESTION_DIMENSION_THRESHOLD,
        );
        let optimizer = ImageOptimizer::new(storage, Arc::clone(&codec));

        Self {
            validator,
            codec,
            optimizer,
            temp_store,
            repository,
            max_batch_size_bytes: config.max_batch_size_bytes,
            max_files_per_request: config.max_files_per_request,
        }
    }

    /// Validate, optimize and persist one batch of files for a product.
    pub async fn process_batch(
        &self,
        product_id: &str,
        files: Vec<UploadedFile>,
    ) -> Result<BatchSummary, BatchError> {
        if files.is_empty() {
            return Err(BatchError::Rejected("No files provided".to_string()));
        }
        if files.len() > self.max_files_per_request {
            return Err(BatchError::Rejected(format!(
                "Too many files. Maximum is {} files per request",
                self.max_files_per_request
            )));
        }

        let total_files = files.len();
        let mut errors: Vec<(usize, String)> = Vec::new();
        let mut accepted: Vec<AcceptedFile> = Vec::new();

        for (index, file) in files.iter().enumerate() {
            match self.validate_file(index, file, product_id).await {
                Ok(temp) => accepted.push(AcceptedFile {
                    index,
                    filename: file.filename.clone(),
                    temp,
                }),
                Err(message) => errors.push((index, message)),
            }
        }

        // Batch ceiling applies to the accepted files together; one
        // oversized batch aborts everything, unlike the per-file checks.
        let accepted_total: u64 = accepted.iter().map(|f| f.temp.size_bytes).sum();
        if accepted_total > self.max_batch_size_bytes as u64 {
            self.purge_temps(&accepted).await;
            return Err(BatchError::Rejected(format!(
                "Total upload size {} bytes exceeds the {} byte limit",
                accepted_total, self.max_batch_size_bytes
            )));
        }

        let offset = match self.repository.collection_len(product_id).await {
            Ok(len) => len as u32,
            Err(e) => {
                self.purge_temps(&accepted).await;
                return Err(BatchError::Internal(e));
            }
        };

        let mut images: Vec<ProductImage> = Vec::new();
        for file in &accepted {
            match self.optimize_file(file, product_id, offset + images.len() as u32).await {
                Ok(image) => images.push(image),
                Err(message) => errors.push((file.index, message)),
            }
        }

        // Unconditional finalizer: no temp artifact survives the request.
        self.purge_temps(&accepted).await;

        let images = if images.is_empty() {
            images
        } else {
            self.repository
                .append(product_id, images)
                .await
                .map_err(BatchError::Internal)?
        };

        errors.sort_by_key(|(index, _)| *index);
        let errors: Vec<String> = errors.into_iter().map(|(_, message)| message).collect();

        let success = !images.is_empty();
        let message = if errors.is_empty() {
            format!("Successfully uploaded {} image(s)", images.len())
        } else if success {
            format!("Uploaded {} of {} image(s)", images.len(), total_files)
        } else {
            "No images were uploaded".to_string()
        };

        tracing::info!(
            product_id = %product_id,
            uploaded = images.len(),
            failed = errors.len(),
            "Processed product image batch"
        );

        Ok(BatchSummary {
            success,
            message,
            images,
            errors,
        })
    }

    /// Declared checks, temp write, then deep content validation.
    /// Returns the temp handle or the filename-prefixed error string.
    async fn validate_file(
        &self,
        index: usize,
        file: &UploadedFile,
        product_id: &str,
    ) -> Result<TempFile, String> {
        let extension = self
            .validator
            .validate_declared(&file.filename, &file.content_type, file.data.len())
            .map_err(|e| format!("{}: {}", file.filename, e))?;

        let temp = self
            .temp_store
            .write(index, &extension, &file.data)
            .await
            .map_err(|e| format!("{}: Failed to store upload: {}", file.filename, e))?;

        match self.validator.deep_validate(&*self.codec, &file.data) {
            Ok(info) => {
                for suggestion in self.validator.suggestions(&info) {
                    tracing::info!(
                        product_id = %product_id,
                        filename = %file.filename,
                        suggestion = %suggestion,
                        "Upload suggestion"
                    );
                }
                Ok(temp)
            }
            Err(e) => {
                // Rejected content does not wait for the batch finalizer.
                self.temp_store.remove(&temp).await;
                Err(format!("{}: {}", file.filename, e))
            }
        }
    }

    async fn optimize_file(
        &self,
        file: &AcceptedFile,
        product_id: &str,
        display_order: u32,
    ) -> Result<ProductImage, String> {
        let data = self
            .temp_store
            .read(&file.temp)
            .await
            .map_err(|e| format!("{}: Failed to read upload: {}", file.filename, e))?;

        self.optimizer
            .optimize(&data, product_id, &file.filename, display_order)
            .await
            .map_err(|e| e.to_string())
    }

    async fn purge_temps(&self, accepted: &[AcceptedFile]) {
        for file in accepted {
            self.temp_store.remove(&file.temp).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryCollectionRepository;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use tempfile::tempdir;
    use vitrine_processing::ImageRsCodec;
    use vitrine_storage::LocalStorage;

    fn test_config(temp_root: &std::path::Path) -> Config {
        Config {
            server_port: 4000,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
            admin_api_keys: vec!["0123456789abcdef0123456789abcdef".to_string()],
            storage_root: temp_root.join("media").display().to_string(),
            temp_dir: temp_root.join("tmp").display().to_string(),
            max_file_size_bytes: constants::MAX_FILE_SIZE_BYTES,
            max_batch_size_bytes: constants::MAX_BATCH_SIZE_BYTES,
            max_files_per_request: constants::MAX_FILES_PER_REQUEST,
            allowed_extensions: constants::ALLOWED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            allowed_content_types: constants::ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            upload_rate_limit_per_minute: constants::UPLOAD_RATE_LIMIT_PER_MINUTE,
            rate_limit_window_secs: constants::RATE_LIMIT_WINDOW_SECS,
            rate_limit_max_clients: 1000,
        }
    }

    async fn test_service(config: &Config) -> (UploadService, TempStore) {
        let storage = LocalStorage::new(
            &config.storage_root,
            "http://localhost:4000/media".to_string(),
        )
        .await
        .unwrap();
        let temp_store = TempStore::new(&config.temp_dir).await.unwrap();
        let service = UploadService::new(
            config,
            Arc::new(ImageRsCodec::new()),
            Arc::new(storage),
            temp_store.clone(),
            Arc::new(InMemoryCollectionRepository::new()),
        );
        (service, temp_store)
    }

    fn png_file(filename: &str, width: u32, height: u32) -> UploadedFile {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 200, 60, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        UploadedFile {
            filename: filename.to_string(),
            content_type: "image/png".to_string(),
            data: Bytes::from(buffer),
        }
    }

    fn masquerading_exe(filename: &str) -> UploadedFile {
        UploadedFile {
            filename: filename.to_string(),
            content_type: "image/png".to_string(),
            data: Bytes::from_static(b"MZ\x90\x00 this is not pixel data"),
        }
    }

    async fn temp_dir_entries(temp_store: &TempStore) -> usize {
        let mut entries = tokio::fs::read_dir(temp_store.dir()).await.unwrap();
        let mut count = 0;
        while entries.next_entry().await.unwrap().is_some() {
            count += 1;
        }
        count
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let (service, _) = test_service(&config).await;

        let err = service.process_batch("p1", Vec::new()).await.unwrap_err();
        assert!(matches!(err, BatchError::Rejected(ref m) if m == "No files provided"));
    }

    #[tokio::test]
    async fn test_oversized_batch_count_rejected() {
        let dir = tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.max_files_per_request = 2;
        let (service, _) = test_service(&config).await;

        let files = vec![
            png_file("a.png", 10, 10),
            png_file("b.png", 10, 10),
            png_file("c.png", 10, 10),
        ];
        let err = service.process_batch("p1", files).await.unwrap_err();
        assert!(matches!(err, BatchError::Rejected(ref m) if m.contains("Too many files")));
    }

    #[tokio::test]
    async fn test_mixed_batch_preserves_input_order() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let (service, temp_store) = test_service(&config).await;

        let files = vec![
            png_file("first.png", 20, 20),
            masquerading_exe("evil.png"),
            png_file("third.png", 20, 20),
        ];
        let summary = service.process_batch("p1", files).await.unwrap();

        assert!(summary.success);
        assert_eq!(summary.images.len(), 2);
        assert_eq!(summary.images[0].original_filename, "first.png");
        assert_eq!(summary.images[1].original_filename, "third.png");
        assert_eq!(summary.images[0].display_order, 0);
        assert_eq!(summary.images[1].display_order, 1);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("evil.png:"));

        assert_eq!(temp_dir_entries(&temp_store).await, 0);
    }

    #[tokio::test]
    async fn test_all_invalid_batch_is_failure() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let (service, temp_store) = test_service(&config).await;

        let files = vec![masquerading_exe("a.png"), masquerading_exe("b.png")];
        let summary = service.process_batch("p1", files).await.unwrap();

        assert!(!summary.success);
        assert!(summary.images.is_empty());
        assert_eq!(summary.errors.len(), 2);
        assert_eq!(temp_dir_entries(&temp_store).await, 0);
    }

    #[tokio::test]
    async fn test_batch_total_size_aborts_all_and_purges_temps() {
        let dir = tempdir().unwrap();
        let mut config = test_config(dir.path());
        // Per-file limit stays permissive; the combined size of two
        // encoded PNGs is what trips the batch ceiling.
        let probe = png_file("probe.png", 4, 4);
        assert!(probe.data.len() > 50);
        config.max_batch_size_bytes = probe.data.len() + 10;
        let (service, temp_store) = test_service(&config).await;

        let files = vec![png_file("a.png", 4, 4), png_file("b.png", 4, 4)];
        let err = service.process_batch("p1", files).await.unwrap_err();
        assert!(matches!(err, BatchError::Rejected(ref m) if m.contains("Total upload size")));
        assert_eq!(temp_dir_entries(&temp_store).await, 0);
    }

    #[tokio::test]
    async fn test_file_too_large_message_carries_sizes() {
        let dir = tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.max_file_size_bytes = 64;
        let (service, _) = test_service(&config).await;

        let file = png_file("big.png", 32, 32);
        let actual = file.data.len();
        let summary = service.process_batch("p1", vec![file]).await.unwrap();

        assert!(!summary.success);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("big.png:"));
        assert!(summary.errors[0].contains(&actual.to_string()));
        assert!(summary.errors[0].contains("64"));
    }

    #[tokio::test]
    async fn test_successful_batch_appends_to_collection() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let storage = LocalStorage::new(
            &config.storage_root,
            "http://localhost:4000/media".to_string(),
        )
        .await
        .unwrap();
        let temp_store = TempStore::new(&config.temp_dir).await.unwrap();
        let repository = Arc::new(InMemoryCollectionRepository::new());
        let service = UploadService::new(
            &config,
            Arc::new(ImageRsCodec::new()),
            Arc::new(storage),
            temp_store,
            repository.clone(),
        );

        let summary = service
            .process_batch("p1", vec![png_file("a.png", 16, 16)])
            .await
            .unwrap();
        assert!(summary.success);
        assert_eq!(summary.message, "Successfully uploaded 1 image(s)");

        let listed = repository.list("p1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].original_filename, "a.png");
    }
}
