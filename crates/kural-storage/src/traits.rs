//! Storage abstraction trait
//!
//! Image processing talks to storage only through this trait, so the filesystem
//! can be swapped for an in-memory map in tests.

use crate::keys::PublicPaths;
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Filesystem-level facts about a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Outcome of deleting one public path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub path: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Storage abstraction trait
///
/// Keys are relative paths under the upload root (see the crate root
/// documentation); every write returns the public path of the stored object.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `data` under `key`, creating intermediate directories as needed.
    ///
    /// Existing objects are never overwritten: writing to a taken key fails
    /// with [`StorageError::AlreadyExists`].
    async fn write(&self, key: &str, data: Bytes) -> StorageResult<String>;

    /// Read a stored object.
    async fn read(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Remove a stored object. Missing objects yield [`StorageError::NotFound`].
    async fn remove(&self, key: &str) -> StorageResult<()>;

    /// Size and timestamps of a stored object.
    async fn stat(&self, key: &str) -> StorageResult<FileStat>;

    /// Key <-> public path mapping used by this backend.
    fn public_paths(&self) -> &PublicPaths;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Delete every public path independently and report each attempt.
    ///
    /// One failure never stops the rest of the batch.
    async fn delete(&self, paths: &[String]) -> Vec<DeleteOutcome> {
        let mut outcomes = Vec::with_capacity(paths.len());

        for path in paths {
            let result = match self.public_paths().to_key(path) {
                Ok(key) => self.remove(&key).await,
                Err(e) => Err(e),
            };

            let outcome = match result {
                Ok(()) => DeleteOutcome {
                    path: path.clone(),
                    success: true,
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Failed to delete stored file");
                    DeleteOutcome {
                        path: path.clone(),
                        success: false,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}
