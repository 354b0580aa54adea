//! Size-bounded JPEG re-encoding for outbound delivery.

use idgate_types::EncodedImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use tracing::{debug, warn};

use crate::codec::decode;
use crate::error::PreprocessError;

/// Quality ladder and downscale bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompressionOptions {
    /// Longest edge after downscaling. Smaller images are left alone.
    pub max_dimension: u32,
    pub initial_quality: u8,
    pub quality_step: u8,
    pub min_quality: u8,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            max_dimension: 1280,
            initial_quality: 90,
            quality_step: 10,
            min_quality: 30,
        }
    }
}

impl CompressionOptions {
    fn validate(&self) -> Result<(), PreprocessError> {
        if self.max_dimension == 0 {
            return Err(PreprocessError::InvalidOptions("max_dimension must be positive".into()));
        }
        if self.quality_step == 0 {
            return Err(PreprocessError::InvalidOptions("quality_step must be positive".into()));
        }
        if !(1..=100).contains(&self.min_quality)
            || !(self.min_quality..=100).contains(&self.initial_quality)
        {
            return Err(PreprocessError::InvalidOptions(format!(
                "quality range {}..={} is not within 1..=100",
                self.min_quality, self.initial_quality
            )));
        }
        Ok(())
    }

    /// Qualities to try, best first, always ending at the floor.
    fn ladder(&self) -> Vec<u8> {
        let mut qualities = Vec::new();
        let mut q = self.initial_quality;
        while q > self.min_quality {
            qualities.push(q);
            q = q.saturating_sub(self.quality_step);
        }
        qualities.push(self.min_quality);
        qualities
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompressedImage {
    pub image: EncodedImage,
    pub quality: u8,
    pub width: u32,
    pub height: u32,
    /// False when even the floor quality exceeded the target.
    pub reached_target: bool,
}

/// Compress with the default ladder (max edge 1280, quality 90 down to 30).
pub fn compress_for_transport(
    image: &EncodedImage,
    target_bytes: usize,
) -> Result<CompressedImage, PreprocessError> {
    compress_with(image, target_bytes, &CompressionOptions::default())
}

/// Return the first encoding at or under `target_bytes`, or the floor-quality
/// encoding if none fits.
pub fn compress_with(
    image: &EncodedImage,
    target_bytes: usize,
    options: &CompressionOptions,
) -> Result<CompressedImage, PreprocessError> {
    options.validate()?;
    let source = decode(image)?;
    let scaled = downscale(source, options.max_dimension);
    let rgb = scaled.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut last = None;
    for quality in options.ladder() {
        let bytes = encode_jpeg(&rgb, quality)?;
        debug!(quality, bytes = bytes.len(), target_bytes, "jpeg attempt");
        if bytes.len() <= target_bytes {
            return Ok(CompressedImage {
                image: EncodedImage::jpeg(bytes),
                quality,
                width,
                height,
                reached_target: true,
            });
        }
        last = Some((quality, bytes));
    }

    let (quality, bytes) = last.ok_or_else(|| {
        PreprocessError::InvalidOptions("empty quality ladder".into())
    })?;
    warn!(
        quality,
        bytes = bytes.len(),
        target_bytes,
        "image still over target at floor quality"
    );
    Ok(CompressedImage {
        image: EncodedImage::jpeg(bytes),
        quality,
        width,
        height,
        reached_target: false,
    })
}

fn downscale(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    if image.width().max(image.height()) <= max_dimension {
        return image;
    }
    // `resize` keeps the aspect ratio and fits within the bounds.
    image.resize(max_dimension, max_dimension, FilterType::Triangle)
}

fn encode_jpeg(rgb: &RgbImage, quality: u8) -> Result<Vec<u8>, PreprocessError> {
    let mut bytes = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
        encoder
            .encode_image(rgb)
            .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_png;
    use idgate_types::ImageMime;
    use image::Rgb;

    fn noisy(width: u32, height: u32) -> EncodedImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            let v = (x.wrapping_mul(31) ^ y.wrapping_mul(17)) as u8;
            Rgb([v, v.wrapping_add(40), v.wrapping_mul(3)])
        });
        encode_png(&DynamicImage::ImageRgb8(img)).unwrap()
    }

    #[test]
    fn default_ladder_steps_by_ten() {
        assert_eq!(
            CompressionOptions::default().ladder(),
            vec![90, 80, 70, 60, 50, 40, 30]
        );
    }

    #[test]
    fn uneven_ladder_still_ends_at_floor() {
        let options = CompressionOptions {
            initial_quality: 85,
            quality_step: 20,
            min_quality: 30,
            ..Default::default()
        };
        assert_eq!(options.ladder(), vec![85, 65, 45, 30]);
    }

    #[test]
    fn generous_target_keeps_initial_quality() {
        let out = compress_for_transport(&noisy(64, 48), usize::MAX).unwrap();
        assert_eq!(out.quality, 90);
        assert!(out.reached_target);
        assert_eq!(out.image.mime(), ImageMime::Jpeg);
        assert_eq!((out.width, out.height), (64, 48));
    }

    #[test]
    fn impossible_target_returns_floor_quality() {
        let out = compress_for_transport(&noisy(64, 48), 1).unwrap();
        assert_eq!(out.quality, 30);
        assert!(!out.reached_target);
    }

    #[test]
    fn large_images_are_downscaled_preserving_aspect() {
        let out = compress_for_transport(&noisy(1600, 800), usize::MAX).unwrap();
        assert_eq!((out.width, out.height), (1280, 640));
    }

    #[test]
    fn invalid_options_are_rejected() {
        let options = CompressionOptions {
            quality_step: 0,
            ..Default::default()
        };
        assert!(matches!(
            compress_with(&noisy(8, 8), 1000, &options),
            Err(PreprocessError::InvalidOptions(_))
        ));
    }
}
