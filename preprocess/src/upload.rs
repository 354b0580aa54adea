//! Acceptance rules for user-selected document files.

use idgate_types::{EncodedImage, ImageMime, UploadedFile};
use tracing::debug;

use crate::error::{PreprocessError, UploadRejection};

pub const MAX_UPLOAD_BYTES: usize = 3 * 1024 * 1024;

/// Anything smaller is assumed to be truncated.
pub const MIN_UPLOAD_BYTES: usize = 1024;

const ALLOWED_EXTENSIONS: [&str; 3] = [".png", ".jpg", ".jpeg"];

/// Check a selected file and wrap it as an [`UploadedFile`].
///
/// Rules run cheapest first: declared type, extension, size bounds, then a
/// full decode.
pub fn validate_upload(
    file_name: &str,
    mime: &str,
    bytes: Vec<u8>,
) -> Result<UploadedFile, PreprocessError> {
    let declared = ImageMime::from_mime(mime)
        .ok_or_else(|| UploadRejection::UnsupportedType(mime.to_string()))?;

    let lower = file_name.to_ascii_lowercase();
    if !ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return Err(UploadRejection::UnsupportedExtension(file_name.to_string()).into());
    }

    let size = bytes.len();
    if size > MAX_UPLOAD_BYTES {
        return Err(UploadRejection::TooLarge { size }.into());
    }
    if size < MIN_UPLOAD_BYTES {
        return Err(UploadRejection::TooSmall { size }.into());
    }

    // Content wins over the declared type when they disagree.
    let mime = ImageMime::sniff(&bytes).ok_or(UploadRejection::Undecodable)?;
    if mime != declared {
        debug!(file_name, declared = %declared, actual = %mime, "upload type mismatch");
    }
    let image = EncodedImage::new(mime, bytes);
    image::load_from_memory(image.bytes()).map_err(|_| UploadRejection::Undecodable)?;

    Ok(UploadedFile {
        file_name: file_name.to_string(),
        image,
    })
}
