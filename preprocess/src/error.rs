use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreprocessError {
    #[error("image could not be decoded: {0}")]
    Decode(String),

    #[error("image could not be encoded: {0}")]
    Encode(String),

    #[error("image has no pixels")]
    EmptyImage,

    #[error("{0}")]
    UploadRejected(#[from] UploadRejection),

    #[error("invalid compression options: {0}")]
    InvalidOptions(String),
}

/// Why a selected document file was refused. The display text is shown to
/// the applicant as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("Please upload only PNG, JPG, or JPEG files.")]
    UnsupportedType(String),

    #[error("Please upload only PNG, JPG, or JPEG files.")]
    UnsupportedExtension(String),

    #[error("File size ({:.2}MB) exceeds the 3MB limit. Please choose a smaller file.", megabytes(.size))]
    TooLarge { size: usize },

    #[error("File appears to be corrupted or too small.")]
    TooSmall { size: usize },

    #[error("File could not be read as an image. Please choose another file.")]
    Undecodable,
}

fn megabytes(size: &usize) -> f64 {
    *size as f64 / (1024.0 * 1024.0)
}
