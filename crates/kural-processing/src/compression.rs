use crate::error::TranscodeError;
use bytes::Bytes;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::{DynamicImage, GenericImageView, ImageFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;

/// WebP encoder effort, 0 (fast) to 6 (slowest, smallest output).
const WEBP_METHOD: i32 = 6;

/// Output formats the transcoder can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    #[default]
    WebP,
    /// First frame only; animation is not preserved.
    Gif,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "jpeg" | "jpg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            "webp" => Some(OutputFormat::WebP),
            "gif" => Some(OutputFormat::Gif),
            _ => None,
        }
    }

    /// Like [`OutputFormat::parse`], but unknown names fall back to WebP with a warning.
    pub fn parse_or_webp(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            tracing::warn!(
                requested = %s,
                fallback = "webp",
                "Unrecognized output format, falling back to WebP"
            );
            OutputFormat::WebP
        })
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Gif => "gif",
        }
    }

}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Gif => "gif",
        };
        f.write_str(name)
    }
}

/// Percentage of bytes saved, rounded to two decimals. Negative when the output grew.
pub fn compression_ratio(original_size: usize, output_size: usize) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    let saved = (original_size as f64 - output_size as f64) / original_size as f64 * 100.0;
    (saved * 100.0).round() / 100.0
}

/// Encoders for every [`OutputFormat`]
pub struct ImageCompressor;

impl ImageCompressor {
    /// Encode `img` as `format`. `quality` is 1-100; PNG and GIF are lossless and ignore it.
    pub fn compress(
        img: &DynamicImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Bytes, TranscodeError> {
        let quality = quality.clamp(1, 100);
        let encode_error = |message: String| TranscodeError::Encode { format, message };

        match format {
            OutputFormat::Jpeg => Self::compress_jpeg(img, quality).map_err(|e| encode_error(e.to_string())),
            OutputFormat::Png => Self::compress_png(img).map_err(|e| encode_error(e.to_string())),
            OutputFormat::WebP => Self::compress_webp(img, quality).map_err(encode_error),
            OutputFormat::Gif => Self::compress_gif(img).map_err(|e| encode_error(e.to_string())),
        }
    }

    /// Progressive JPEG via mozjpeg
    fn compress_jpeg(img: &DynamicImage, quality: u8) -> std::io::Result<Bytes> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp.start_compress(Vec::new())?;
        comp.write_scanlines(&rgb_img)?;
        let jpeg_data = comp.finish()?;

        Ok(Bytes::from(jpeg_data))
    }

    // The png codec has no Adam7 writer, so output is non-interlaced at maximum compression.
    fn compress_png(img: &DynamicImage) -> image::ImageResult<Bytes> {
        let mut buffer = Vec::new();
        let encoder = PngEncoder::new_with_quality(
            Cursor::new(&mut buffer),
            CompressionType::Best,
            PngFilterType::Adaptive,
        );
        img.write_with_encoder(encoder)?;

        Ok(Bytes::from(buffer))
    }

    fn compress_webp(img: &DynamicImage, quality: u8) -> Result<Bytes, String> {
        let (width, height) = img.dimensions();
        let rgba_img = img.to_rgba8();

        let mut config = webp::WebPConfig::new()
            .map_err(|_| "Failed to initialise WebP encoder config".to_string())?;
        config.quality = quality as f32;
        config.method = WEBP_METHOD;

        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
        let webp_data = encoder
            .encode_advanced(&config)
            .map_err(|e| format!("{:?}", e))?;

        Ok(Bytes::copy_from_slice(&webp_data))
    }

    fn compress_gif(img: &DynamicImage) -> image::ImageResult<Bytes> {
        let mut buffer = Vec::new();
        DynamicImage::ImageRgba8(img.to_rgba8())
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Gif)?;

        Ok(Bytes::from(buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ImageMetadata;
    use image::{Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("jpeg"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::parse("JPG"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::parse("png"), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::parse("webp"), Some(OutputFormat::WebP));
        assert_eq!(OutputFormat::parse("gif"), Some(OutputFormat::Gif));
        assert_eq!(OutputFormat::parse("avif"), None);
    }

    #[test]
    fn test_unknown_format_falls_back_to_webp() {
        assert_eq!(OutputFormat::parse_or_webp("tiff"), OutputFormat::WebP);
        assert_eq!(OutputFormat::parse_or_webp(""), OutputFormat::WebP);
        assert_eq!(OutputFormat::parse_or_webp("png"), OutputFormat::Png);
    }

    #[test]
    fn test_compression_ratio() {
        assert_eq!(compression_ratio(1000, 250), 75.0);
        assert_eq!(compression_ratio(3, 2), 33.33);
        assert_eq!(compression_ratio(3, 1), 66.67);
        assert_eq!(compression_ratio(1000, 1000), 0.0);
        assert_eq!(compression_ratio(0, 10), 0.0);
    }

    #[test]
    fn test_compression_ratio_negative_when_output_grows() {
        assert_eq!(compression_ratio(100, 150), -50.0);
        assert_eq!(compression_ratio(3, 4), -33.33);
    }

    #[test]
    fn test_every_format_encodes_decodable_output() {
        let img = gradient(64, 48);
        for format in [
            OutputFormat::Jpeg,
            OutputFormat::Png,
            OutputFormat::WebP,
            OutputFormat::Gif,
        ] {
            let data = ImageCompressor::compress(&img, format, 85).unwrap();
            let metadata = ImageMetadata::read(&data).unwrap();
            assert_eq!((metadata.width, metadata.height), (64, 48), "{format}");
            assert_eq!(metadata.format, format.to_string());
        }
    }

    #[test]
    fn test_lower_quality_webp_is_smaller() {
        let img = gradient(200, 200);
        let high = ImageCompressor::compress(&img, OutputFormat::WebP, 95).unwrap();
        let low = ImageCompressor::compress(&img, OutputFormat::WebP, 10).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_output_format_extension() {
        assert_eq!(OutputFormat::WebP.extension(), "webp");
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert_eq!(OutputFormat::Gif.to_string(), "gif");
    }
}
