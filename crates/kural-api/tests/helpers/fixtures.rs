//! Synthesised upload fixtures.

use axum_test::multipart::Part;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// Encode a gradient test image of the given size.
pub fn image_bytes(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), format)
        .expect("Failed to encode fixture image");
    buffer
}

pub fn jpeg_part(width: u32, height: u32, filename: &str) -> Part {
    Part::bytes(image_bytes(width, height, ImageFormat::Jpeg))
        .file_name(filename)
        .mime_type("image/jpeg")
}

pub fn png_part(width: u32, height: u32, filename: &str) -> Part {
    Part::bytes(image_bytes(width, height, ImageFormat::Png))
        .file_name(filename)
        .mime_type("image/png")
}

pub fn text_file_part(filename: &str) -> Part {
    Part::bytes(b"not an image at all".to_vec())
        .file_name(filename)
        .mime_type("text/plain")
}
