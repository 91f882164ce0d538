//! Kural Core Library
//!
//! This crate provides the error taxonomy, configuration and shared constants
//! used by every Kural component.

pub mod config;
pub mod constants;
pub mod error;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, ServerConfig, UploadConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
