use crate::upload::UploadCandidate;
use kural_core::constants::{DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_FILE_SIZE_MB};
use serde::Serialize;

/// Verdict of [`ImageValidator::validate`]. `is_valid` holds iff `errors` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Upload validator
///
/// Checks declared size, filename extension and MIME type before any byte of the
/// image is decoded. Every check runs; all violations are reported together.
#[derive(Debug, Clone)]
pub struct ImageValidator {
    max_file_size: usize,
    allowed_extensions: Vec<String>,
}

impl ImageValidator {
    pub fn new(max_file_size: usize, allowed_extensions: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    pub fn validate(&self, candidate: &UploadCandidate) -> ValidationResult {
        let mut errors = Vec::new();

        if let Some(message) = self.check_size(candidate.size) {
            errors.push(message);
        }
        if let Some(message) = self.check_extension(candidate) {
            errors.push(message);
        }
        if let Some(message) = Self::check_mime_type(&candidate.mime_type) {
            errors.push(message);
        }

        ValidationResult::from_errors(errors)
    }

    fn check_size(&self, size: usize) -> Option<String> {
        if size == 0 {
            return Some("File is empty".to_string());
        }

        if size > self.max_file_size {
            return Some(format!(
                "File size {} bytes exceeds the maximum of {} bytes",
                size, self.max_file_size
            ));
        }

        None
    }

    fn check_extension(&self, candidate: &UploadCandidate) -> Option<String> {
        match candidate.extension() {
            Some(ext) if self.allowed_extensions.contains(&ext) => None,
            Some(ext) => Some(format!(
                "File extension '.{}' is not allowed (allowed: {})",
                ext,
                self.allowed_extensions.join(", ")
            )),
            None => Some(format!(
                "File '{}' has no extension (allowed: {})",
                candidate.filename,
                self.allowed_extensions.join(", ")
            )),
        }
    }

    fn check_mime_type(mime_type: &str) -> Option<String> {
        if mime_type.trim().to_lowercase().starts_with("image/") {
            None
        } else {
            Some(format!("Content type '{}' is not an image type", mime_type))
        }
    }
}

impl Default for ImageValidator {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_FILE_SIZE_MB * 1024 * 1024,
            DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        )
    }
}
