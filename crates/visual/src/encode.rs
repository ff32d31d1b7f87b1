//! PNG + base64 transport encoding for report attachments

use base64::{engine::general_purpose::STANDARD, Engine};
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageFormat, RgbaImage};

use crate::error::VisualResult;

/// Encode an image as PNG bytes
pub fn image_to_png(image: &RgbaImage) -> VisualResult<Vec<u8>> {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ColorType::Rgba8,
    )?;
    Ok(buffer)
}

/// Encode an image as a base64 PNG string
pub fn image_to_b64(image: &RgbaImage) -> VisualResult<String> {
    Ok(STANDARD.encode(image_to_png(image)?))
}

/// Encode PNG bytes as they were captured
pub fn png_to_b64(png: &[u8]) -> String {
    STANDARD.encode(png)
}

/// Decode a base64 PNG string back into an image
pub fn b64_to_image(encoded: &str) -> VisualResult<RgbaImage> {
    let bytes = STANDARD.decode(encoded)?;
    let image = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?;
    Ok(image.to_rgba8())
}
