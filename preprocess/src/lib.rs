//! Image preprocessing.
//!
//! - [`enhance_for_comparison`]: normalise a face image before it is sent to
//!   the comparator (fixed size, grayscale, mild contrast boost).
//! - [`compress_for_transport`]: shrink an image until it fits a byte budget.
//! - [`validate_upload`]: gate user-selected document files.
//!
//! Everything here is pure: the same input bytes always produce the same
//! output bytes.

pub mod codec;
pub mod compress;
pub mod enhance;
pub mod error;
pub mod upload;

pub use codec::{decode, encode_png};
pub use compress::{compress_for_transport, compress_with, CompressedImage, CompressionOptions};
pub use enhance::{enhance_for_comparison, enhance_with_size, ENHANCED_SIZE};
pub use error::{PreprocessError, UploadRejection};
pub use upload::{validate_upload, MAX_UPLOAD_BYTES, MIN_UPLOAD_BYTES};
