//! Image metadata types

use image::{ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Metadata read back from encoded image bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: String,
}

impl ImageMetadata {
    /// Read format and dimensions from the image header without decoding pixels.
    pub fn read(data: &[u8]) -> Result<Self, String> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| e.to_string())?;

        let format = reader
            .format()
            .ok_or_else(|| "Unrecognized image format".to_string())?;
        let (width, height) = reader.into_dimensions().map_err(|e| e.to_string())?;

        Ok(Self {
            width,
            height,
            format: format_name(format),
        })
    }
}

/// Short lowercase name of a codec format, e.g. `webp`.
pub fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        other => format!("{:?}", other).to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    #[test]
    fn test_read_png_header() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(31, 17));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();

        let metadata = ImageMetadata::read(&buffer).unwrap();
        assert_eq!(
            metadata,
            ImageMetadata {
                width: 31,
                height: 17,
                format: "png".to_string(),
            }
        );
    }

    #[test]
    fn test_read_garbage_fails() {
        assert!(ImageMetadata::read(b"definitely not an image").is_err());
    }

    #[test]
    fn test_serialization() {
        let metadata = ImageMetadata {
            width: 400,
            height: 600,
            format: "webp".to_string(),
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["width"], 400);
        assert_eq!(json["format"], "webp");
    }
}
