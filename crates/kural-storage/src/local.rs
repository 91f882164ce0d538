use crate::keys::{validate_key, PublicPaths};
use crate::traits::{FileStat, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    paths: PublicPaths,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for stored images (e.g., "public/uploads")
    /// * `public_prefix` - Public URL prefix serving that directory (e.g., "/uploads")
    pub async fn new(
        base_path: impl Into<PathBuf>,
        public_prefix: impl Into<String>,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            paths: PublicPaths::new(public_prefix),
        })
    }

    /// Convert storage key to filesystem path
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;
        Ok(self.base_path.join(storage_key))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}

/// Write and sync `data`. On failure the half-written file at `path` is removed.
async fn finish_write(file: &mut fs::File, path: &Path, data: &[u8]) -> StorageResult<()> {
    let written = match file.write_all(data).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    let result = match written {
        Ok(()) => file.sync_all().await.map_err(|e| ("sync", e)),
        Err(e) => Err(("write", e)),
    };

    match result {
        Ok(()) => Ok(()),
        Err((step, e)) => {
            discard_partial(path).await;
            Err(StorageError::WriteFailed(format!(
                "Failed to {} file {}: {}",
                step,
                path.display(),
                e
            )))
        }
    }
}

async fn discard_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        tracing::warn!(
            path = %path.display(),
            error = %e,
            "Failed to remove partially written file"
        );
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn write(&self, key: &str, data: Bytes) -> StorageResult<String> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StorageError::AlreadyExists(key.to_string()),
                _ => StorageError::WriteFailed(format!(
                    "Failed to create file {}: {}",
                    path.display(),
                    e
                )),
            })?;

        finish_write(&mut file, &path, &data).await?;

        let public_path = self.paths.to_public(key);

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(public_path)
    }

    async fn read(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(key)?;

        fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            _ => StorageError::ReadFailed(format!(
                "Failed to read file {}: {}",
                path.display(),
                e
            )),
        })
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        fs::remove_file(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            _ => StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            )),
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn stat(&self, key: &str) -> StorageResult<FileStat> {
        let path = self.key_to_path(key)?;
        let meta = fs::metadata(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            _ => StorageError::IoError(e),
        })?;

        if !meta.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }

        Ok(FileStat {
            size: meta.len(),
            // Not every filesystem records a birth time.
            created_at: meta.created().ok().map(DateTime::<Utc>::from),
            modified_at: meta.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    fn public_paths(&self) -> &PublicPaths {
        &self.paths
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn storage_in(dir: &Path) -> LocalStorage {
        LocalStorage::new(dir.join("public/uploads"), "/uploads")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path()).await;

        let public_path = storage
            .write("books/nested/cover.webp", Bytes::from_static(b"webp bytes"))
            .await
            .unwrap();

        assert_eq!(public_path, "/uploads/books/nested/cover.webp");
        let on_disk = dir.path().join("public/uploads/books/nested/cover.webp");
        assert_eq!(std::fs::read(on_disk).unwrap(), b"webp bytes");
        assert_eq!(
            storage.read("books/nested/cover.webp").await.unwrap(),
            b"webp bytes".to_vec()
        );
    }

    #[tokio::test]
    async fn test_write_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path()).await;

        storage
            .write("books/a.webp", Bytes::from_static(b"first"))
            .await
            .unwrap();
        let result = storage
            .write("books/a.webp", Bytes::from_static(b"second"))
            .await;

        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
        assert_eq!(storage.read("books/a.webp").await.unwrap(), b"first".to_vec());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path()).await;

        let result = storage.read("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.remove("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage
            .write("/etc/passwd", Bytes::from_static(b"x"))
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_remove_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path()).await;

        let result = storage.remove("books/missing.webp").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stat() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path()).await;

        storage
            .write("books/s.webp", Bytes::from_static(b"12345"))
            .await
            .unwrap();

        let stat = storage.stat("books/s.webp").await.unwrap();
        assert_eq!(stat.size, 5);
        assert!(stat.modified_at.is_some());

        assert!(matches!(
            storage.stat("books/none.webp").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.stat("books").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_batch_delete_reports_every_path() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path()).await;

        let kept = storage
            .write("books/one.webp", Bytes::from_static(b"1"))
            .await
            .unwrap();

        let outcomes = storage
            .delete(&[
                "/uploads/books/missing.webp".to_string(),
                kept.clone(),
                "/elsewhere/file.webp".to_string(),
            ])
            .await;

        assert_eq!(outcomes.len(), 3);
        assert!(!outcomes[0].success);
        assert!(outcomes[0].error.is_some());
        assert!(outcomes[1].success);
        assert_eq!(outcomes[1].path, kept);
        assert!(!outcomes[2].success);
        assert!(!dir.path().join("public/uploads/books/one.webp").exists());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_failed_write_removes_partial_file() {
        let dir = tempdir().unwrap();
        let partial = dir.path().join("cover_partial.webp");
        fs::write(&partial, b"half").await.unwrap();

        // Every write to /dev/full fails with ENOSPC.
        let mut sink = fs::OpenOptions::new()
            .write(true)
            .open("/dev/full")
            .await
            .unwrap();

        let result = finish_write(&mut sink, &partial, &[7u8; 64 * 1024]).await;

        assert!(matches!(result, Err(StorageError::WriteFailed(_))));
        assert!(!partial.exists());
    }

    #[tokio::test]
    async fn test_discard_partial_tolerates_missing_file() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("never-written.webp");

        discard_partial(&missing).await;
        assert!(!missing.exists());
    }
}
