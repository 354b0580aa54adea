//! Face-image normalisation ahead of comparison.

use idgate_types::EncodedImage;
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use tracing::debug;

use crate::codec::{decode, encode_png};
use crate::error::PreprocessError;

/// Edge length of the square raster handed to the comparator.
pub const ENHANCED_SIZE: u32 = 400;

const CONTRAST: f32 = 1.1;

/// Resize to a 400×400 square, convert to luminance grayscale, apply a
/// slight contrast stretch around mid-gray and re-encode as PNG. Alpha is
/// kept.
pub fn enhance_for_comparison(image: &EncodedImage) -> Result<EncodedImage, PreprocessError> {
    enhance_with_size(image, ENHANCED_SIZE)
}

pub fn enhance_with_size(image: &EncodedImage, size: u32) -> Result<EncodedImage, PreprocessError> {
    if size == 0 {
        return Err(PreprocessError::EmptyImage);
    }
    let source = decode(image)?;
    let resized = source.resize_exact(size, size, FilterType::Triangle).to_rgba8();
    let enhanced = RgbaImage::from_fn(size, size, |x, y| enhance_pixel(*resized.get_pixel(x, y)));
    let out = encode_png(&DynamicImage::ImageRgba8(enhanced))?;
    debug!(
        input_bytes = image.len(),
        output_bytes = out.len(),
        size,
        "image enhanced for comparison"
    );
    Ok(out)
}

fn enhance_pixel(Rgba([r, g, b, a]): Rgba<u8>) -> Rgba<u8> {
    let gray = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
    let v = ((gray - 128.0) * CONTRAST + 128.0).clamp(0.0, 255.0).round() as u8;
    Rgba([v, v, v, a])
}
