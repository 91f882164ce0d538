//! Application-wide constants.

/// Public path of the cover shown when an entity has no custom image.
/// Never passed to storage deletion.
pub const DEFAULT_COVER_PLACEHOLDER: &str = "/assets/images/default-book.svg";

/// Hard ceiling on output width, applied to every transcode regardless of the request.
pub const MAX_OUTPUT_WIDTH: u32 = 1200;

/// Hard ceiling on output height, applied to every transcode regardless of the request.
pub const MAX_OUTPUT_HEIGHT: u32 = 1600;

/// Quality used when a caller does not pick one.
pub const DEFAULT_QUALITY: u8 = 85;

pub const DEFAULT_MAX_FILE_SIZE_MB: usize = 5;

pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "webp", "gif"];

pub const DEFAULT_UPLOAD_ROOT: &str = "public/uploads";

pub const DEFAULT_PUBLIC_PREFIX: &str = "/uploads";

pub const DEFAULT_ENTITY_TYPE: &str = "books";

pub const DEFAULT_MAX_GALLERY_FILES: usize = 10;

/// Versioned prefix for every API route.
pub const API_PREFIX: &str = "/api/v1";

/// Owner ids and entity types end up in filenames and directory names.
pub const SAFE_SEGMENT_PATTERN: &str = r"^[A-Za-z0-9_-]{1,64}$";

/// Check that `segment` can be embedded in a storage path as-is.
pub fn is_safe_path_segment(segment: &str) -> bool {
    static PATTERN: std::sync::LazyLock<regex::Regex> = std::sync::LazyLock::new(|| {
        regex::Regex::new(SAFE_SEGMENT_PATTERN).expect("SAFE_SEGMENT_PATTERN is a valid regex")
    });
    PATTERN.is_match(segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_path_segment() {
        assert!(is_safe_path_segment("64f1c2ab9e"));
        assert!(is_safe_path_segment("book_12-a"));
        assert!(!is_safe_path_segment(""));
        assert!(!is_safe_path_segment("../etc"));
        assert!(!is_safe_path_segment("a/b"));
        assert!(!is_safe_path_segment("with space"));
        assert!(!is_safe_path_segment(&"x".repeat(65)));
    }
}
