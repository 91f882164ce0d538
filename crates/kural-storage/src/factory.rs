#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-memory")]
use crate::MemoryStorage;
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use kural_core::Config;
use std::sync::Arc;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let upload = &config.upload;

    match upload.storage_backend {
        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            if upload.upload_root.trim().is_empty() {
                return Err(StorageError::ConfigError(
                    "UPLOAD_ROOT not configured".to_string(),
                ));
            }
            let storage =
                LocalStorage::new(upload.upload_root.clone(), upload.public_prefix.clone())
                    .await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-memory")]
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; uploaded images are lost on restart");
            Ok(Arc::new(MemoryStorage::new(upload.public_prefix.clone())))
        }

        #[cfg(not(feature = "storage-memory"))]
        StorageBackend::Memory => Err(StorageError::ConfigError(
            "Memory storage backend not available (storage-memory feature not enabled)"
                .to_string(),
        )),
    }
}
