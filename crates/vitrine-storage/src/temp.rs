//! Scratch storage for in-flight upload artifacts.
//!
//! Every file accepted by the validator is first written here and removed
//! again before the request finishes, whatever the outcome. Names carry a
//! millisecond timestamp, the file's position in the batch, and a random
//! suffix so concurrent requests cannot collide.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::traits::{StorageError, StorageResult};

/// Handle to a single temp artifact.
#[derive(Debug, Clone)]
pub struct TempFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Per-request scratch space under a single directory.
#[derive(Clone)]
pub struct TempStore {
    dir: PathBuf,
}

impl TempStore {
    pub async fn new(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create temp directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(TempStore { dir })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Write one artifact, returning its handle.
    ///
    /// `index` is the file's position in the upload batch; it keeps names
    /// unique within a request while the random suffix keeps them unique
    /// across requests.
    pub async fn write(
        &self,
        index: usize,
        extension: &str,
        data: &[u8],
    ) -> StorageResult<TempFile> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let name = format!(
            "{}_{}_{:08x}.{}",
            millis,
            index,
            rand::random::<u32>(),
            extension
        );
        let path = self.dir.join(name);

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to create temp file {}: {}",
                path.display(),
                e
            ))
        })?;
        file.write_all(data).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to write temp file {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(TempFile {
            path,
            size_bytes: data.len() as u64,
        })
    }

    pub async fn read(&self, file: &TempFile) -> StorageResult<Vec<u8>> {
        fs::read(&file.path).await.map_err(|e| {
            StorageError::DownloadFailed(format!(
                "Failed to read temp file {}: {}",
                file.path.display(),
                e
            ))
        })
    }

    /// Best-effort removal. Failures are logged, never surfaced; a leaked
    /// temp file must not fail the request that created it.
    pub async fn remove(&self, file: &TempFile) {
        if let Err(e) = fs::remove_file(&file.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %file.path.display(),
                    error = %e,
                    "Failed to remove temp file"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_creates_file_with_extension() {
        let dir = tempdir().unwrap();
        let store = TempStore::new(dir.path()).await.unwrap();

        let file = store.write(0, "jpg", b"data").await.unwrap();
        assert!(file.path.exists());
        assert_eq!(file.size_bytes, 4);
        assert_eq!(file.path.extension().unwrap(), "jpg");

        let read_back = store.read(&file).await.unwrap();
        assert_eq!(read_back, b"data");
    }

    #[tokio::test]
    async fn test_same_index_produces_distinct_names() {
        let dir = tempdir().unwrap();
        let store = TempStore::new(dir.path()).await.unwrap();

        let a = store.write(3, "png", b"a").await.unwrap();
        let b = store.write(3, "png", b"b").await.unwrap();
        assert_ne!(a.path, b.path);
    }

    #[tokio::test]
    async fn test_remove_deletes_file() {
        let dir = tempdir().unwrap();
        let store = TempStore::new(dir.path()).await.unwrap();

        let file = store.write(0, "webp", b"x").await.unwrap();
        store.remove(&file).await;
        assert!(!file.path.exists());

        // Removing again must not panic or error.
        store.remove(&file).await;
    }
}
