//! In-memory storage backend.
//!
//! Holds objects in a map instead of on disk. Every removal attempt is recorded,
//! and writes can be made to fail on purpose, so tests can observe exactly what
//! the processing layer asked storage to do.

use crate::keys::{validate_key, PublicPaths};
use crate::traits::{FileStat, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
    objects: HashMap<String, StoredObject>,
    removal_log: Vec<String>,
    failing_writes: Vec<String>,
}

/// Map-backed storage. Clones share the same underlying state.
#[derive(Clone)]
pub struct MemoryStorage {
    state: Arc<RwLock<MemoryState>>,
    paths: PublicPaths,
}

impl MemoryStorage {
    pub fn new(public_prefix: impl Into<String>) -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
            paths: PublicPaths::new(public_prefix),
        }
    }

    /// Make every future write whose key contains `needle` fail with `WriteFailed`.
    pub async fn fail_writes_matching(&self, needle: impl Into<String>) {
        self.state.write().await.failing_writes.push(needle.into());
    }

    /// Every key `remove` was called with, in call order, whether or not it existed.
    pub async fn removal_log(&self) -> Vec<String> {
        self.state.read().await.removal_log.clone()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.state.read().await.objects.contains_key(key)
    }

    /// Stored keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut keys: Vec<String> = state.objects.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.objects.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.objects.is_empty()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(kural_core::constants::DEFAULT_PUBLIC_PREFIX)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn write(&self, key: &str, data: Bytes) -> StorageResult<String> {
        validate_key(key)?;
        let mut state = self.state.write().await;

        if state.failing_writes.iter().any(|needle| key.contains(needle.as_str())) {
            return Err(StorageError::WriteFailed(format!(
                "Injected write failure for {}",
                key
            )));
        }

        if state.objects.contains_key(key) {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }

        tracing::debug!(key = %key, size_bytes = data.len(), "Memory storage write");
        state.objects.insert(
            key.to_string(),
            StoredObject {
                data,
                created_at: Utc::now(),
            },
        );

        Ok(self.paths.to_public(key))
    }

    async fn read(&self, key: &str) -> StorageResult<Vec<u8>> {
        validate_key(key)?;
        self.state
            .read()
            .await
            .objects
            .get(key)
            .map(|object| object.data.to_vec())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        let mut state = self.state.write().await;
        state.removal_log.push(key.to_string());

        match state.objects.remove(key) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(key.to_string())),
        }
    }

    async fn stat(&self, key: &str) -> StorageResult<FileStat> {
        validate_key(key)?;
        let state = self.state.read().await;
        let object = state
            .objects
            .get(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        Ok(FileStat {
            size: object.data.len() as u64,
            created_at: Some(object.created_at),
            modified_at: Some(object.created_at),
        })
    }

    fn public_paths(&self) -> &PublicPaths {
        &self.paths
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
