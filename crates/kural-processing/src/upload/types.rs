//! Types for the upload pipeline.

use bytes::Bytes;
use std::path::Path;

/// One uploaded file, held in memory for the duration of a processing call.
#[derive(Clone, Debug)]
pub struct UploadCandidate {
    pub data: Bytes,
    /// Filename as declared by the client.
    pub filename: String,
    /// MIME type as declared by the client.
    pub mime_type: String,
    pub size: usize,
}

impl UploadCandidate {
    pub fn new(data: impl Into<Bytes>, filename: impl Into<String>, mime_type: impl Into<String>) -> Self {
        let data = data.into();
        Self {
            size: data.len(),
            data,
            filename: filename.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Lowercased extension of the declared filename, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }
}
