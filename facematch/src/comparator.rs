use async_trait::async_trait;
use idgate_types::EncodedImage;

use crate::error::FaceMatchError;

/// Raw answer from a comparator, before the local threshold is applied.
#[derive(Clone, Debug, PartialEq)]
pub struct ComparatorVerdict {
    /// Similarity percentage as reported, not yet rounded.
    pub similarity: f64,
    pub is_match: bool,
    pub method: Option<String>,
}

/// Computes face similarity between a document photo and a live image.
#[async_trait]
pub trait FaceComparator: Send + Sync {
    fn name(&self) -> &str;

    async fn compare(
        &self,
        document: &EncodedImage,
        live: &EncodedImage,
    ) -> Result<ComparatorVerdict, FaceMatchError>;
}
