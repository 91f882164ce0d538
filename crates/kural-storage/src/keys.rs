//! Key validation and the key <-> public path mapping shared by all backends.

use crate::traits::{StorageError, StorageResult};

/// Reject keys that could escape the upload root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }

    if key.starts_with('/') || key.contains('\\') || key.contains('\0') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            key
        )));
    }

    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::InvalidKey(format!(
            "Storage key has an empty or relative segment: {}",
            key
        )));
    }

    Ok(())
}

/// Maps storage keys onto the public URL space and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicPaths {
    prefix: String,
}

impl PublicPaths {
    /// `prefix` is the public URL prefix, e.g. `/uploads`. A trailing slash is ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Public path for a key: `{prefix}/{key}`.
    pub fn to_public(&self, key: &str) -> String {
        format!("{}/{}", self.prefix, key.trim_start_matches('/'))
    }

    /// Storage key for a public path. Paths outside the prefix are rejected.
    pub fn to_key(&self, public_path: &str) -> StorageResult<String> {
        let key = public_path
            .strip_prefix(&self.prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| {
                StorageError::InvalidKey(format!(
                    "Path {} is outside {}",
                    public_path, self.prefix
                ))
            })?;
        validate_key(key)?;
        Ok(key.to_string())
    }
}
