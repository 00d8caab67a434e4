//! Storage abstraction trait
//!
//! This module defines the Storage trait that rendition storage backends
//! must implement.

use async_trait::async_trait;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for vitrine_core::AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => vitrine_core::AppError::NotFound(key),
            StorageError::InvalidKey(msg) => vitrine_core::AppError::BadRequest(msg),
            other => vitrine_core::AppError::Storage(other.to_string()),
        }
    }
}

/// Storage abstraction trait
///
/// Rendition storage backends implement this trait so the optimizer and the
/// delete path never couple to a concrete filesystem or object store.
///
/// **Key format:** `products/{product_id}/{image_id}/{tier}.{ext}`. See the
/// crate root documentation and the `keys` module.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload data to a specific storage key.
    /// Returns the public URL for the uploaded file.
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<String>;

    /// Download a file by its storage key
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Delete a file by its storage key. Deleting a missing key is not an error.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if a file exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;
}
