use crate::compression::OutputFormat;
use kural_storage::StorageError;
use std::time::Duration;
use thiserror::Error;

/// Codec failures. Never retried: malformed image data stays malformed.
#[derive(Debug, Clone, Error)]
pub enum TranscodeError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode {format} image: {message}")]
    Encode {
        format: OutputFormat,
        message: String,
    },

    #[error("Image transcode timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Image transcode task failed: {0}")]
    Task(String),
}

/// Errors surfaced by the upload processor.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Every violation found for the candidate, in check order.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
