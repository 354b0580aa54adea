use std::io::Cursor;

use idgate_types::{EncodedImage, ImageMime};
use image::{DynamicImage, ImageFormat};

use crate::error::PreprocessError;

fn format_of(mime: ImageMime) -> ImageFormat {
    match mime {
        ImageMime::Png => ImageFormat::Png,
        ImageMime::Jpeg => ImageFormat::Jpeg,
    }
}

/// Decode an encoded image, trusting its declared MIME type.
pub fn decode(image: &EncodedImage) -> Result<DynamicImage, PreprocessError> {
    if image.is_empty() {
        return Err(PreprocessError::EmptyImage);
    }
    let decoded = image::load_from_memory_with_format(image.bytes(), format_of(image.mime()))
        .map_err(|e| PreprocessError::Decode(e.to_string()))?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(PreprocessError::EmptyImage);
    }
    Ok(decoded)
}

pub fn encode_png(image: &DynamicImage) -> Result<EncodedImage, PreprocessError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(EncodedImage::png(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn png_survives_a_round_trip() {
        let original = DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 3, Rgb([9, 8, 7])));
        let encoded = encode_png(&original).unwrap();
        assert_eq!(encoded.mime(), ImageMime::Png);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.to_rgb8(), original.to_rgb8());
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode(&EncodedImage::png(vec![1, 2, 3])).unwrap_err();
        assert!(matches!(err, PreprocessError::Decode(_)));
    }

    #[test]
    fn empty_bytes_are_empty_image() {
        assert_eq!(
            decode(&EncodedImage::jpeg(Vec::new())).unwrap_err(),
            PreprocessError::EmptyImage
        );
    }
}
