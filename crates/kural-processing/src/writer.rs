//! Storage facade used by the processor: writes under the entity directory,
//! batch deletes and never-failing probes.

use crate::metadata::ImageMetadata;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use kural_storage::{DeleteOutcome, Storage, StorageResult};
use serde::Serialize;
use std::sync::Arc;

/// What is known about a stored public path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImageMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeReport {
    fn missing(error: impl Into<String>) -> Self {
        Self {
            exists: false,
            metadata: None,
            size: None,
            created_at: None,
            modified_at: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Clone)]
pub struct StorageWriter {
    storage: Arc<dyn Storage>,
    entity_type: String,
}

impl StorageWriter {
    pub fn new(storage: Arc<dyn Storage>, entity_type: impl Into<String>) -> Self {
        Self {
            storage,
            entity_type: entity_type.into(),
        }
    }

    /// Storage key for a file in this writer's entity directory.
    pub fn key_for(&self, filename: &str) -> String {
        format!("{}/{}", self.entity_type, filename)
    }

    /// Public path a file in the entity directory is served from.
    pub fn public_path_for(&self, filename: &str) -> String {
        self.storage.public_paths().to_public(&self.key_for(filename))
    }

    /// Write `data` as `filename` in the entity directory and return its public path.
    pub async fn write(&self, data: Bytes, filename: &str) -> StorageResult<String> {
        self.storage.write(&self.key_for(filename), data).await
    }

    /// Delete public paths independently; every attempt is reported.
    pub async fn delete(&self, paths: &[String]) -> Vec<DeleteOutcome> {
        self.storage.delete(paths).await
    }

    /// Never fails: any storage error becomes `exists: false` with the error message.
    pub async fn probe(&self, public_path: &str) -> ProbeReport {
        let key = match self.storage.public_paths().to_key(public_path) {
            Ok(key) => key,
            Err(e) => return ProbeReport::missing(e.to_string()),
        };

        let stat = match self.storage.stat(&key).await {
            Ok(stat) => stat,
            Err(e) => {
                tracing::debug!(path = %public_path, error = %e, "Probe found no stored file");
                return ProbeReport::missing(e.to_string());
            }
        };

        let metadata = match self.storage.read(&key).await {
            Ok(data) => match ImageMetadata::read(&data) {
                Ok(metadata) => Some(metadata),
                Err(e) => {
                    tracing::debug!(path = %public_path, error = %e, "Stored file is not a readable image");
                    None
                }
            },
            Err(e) => return ProbeReport::missing(e.to_string()),
        };

        ProbeReport {
            exists: true,
            metadata,
            size: Some(stat.size),
            created_at: stat.created_at,
            modified_at: stat.modified_at,
            error: None,
        }
    }
}
