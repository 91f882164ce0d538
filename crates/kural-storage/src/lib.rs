//! Kural Storage Library
//!
//! Storage port and backends for uploaded images.
//!
//! # Key format
//!
//! Keys are relative, slash-separated paths under the upload root, for example
//! `books/cover_64f1_1718000000000.webp`. Each key has exactly one public path,
//! `{public_prefix}/{key}` (`/uploads/books/cover_64f1_1718000000000.webp` by default);
//! entity records hold public paths, backends work on keys. The mapping lives in
//! the `keys` module so every backend agrees on it.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-memory")]
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::PublicPaths;
pub use kural_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-memory")]
pub use memory::MemoryStorage;
pub use traits::{DeleteOutcome, FileStat, Storage, StorageError, StorageResult};
