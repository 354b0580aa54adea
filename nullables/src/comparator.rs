//! Nullable face comparator: answers from a script.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use idgate_facematch::{ComparatorVerdict, FaceComparator, FaceMatchError};
use idgate_types::EncodedImage;

use crate::lock;

/// A comparator that pops scripted answers in order. With the script empty
/// it falls back to the default answer, if one is set.
pub struct NullComparator {
    script: Mutex<VecDeque<Result<ComparatorVerdict, FaceMatchError>>>,
    fallback: Mutex<Option<ComparatorVerdict>>,
    inputs: Mutex<Vec<(EncodedImage, EncodedImage)>>,
}

impl NullComparator {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(None),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `similarity` / `is_match` once the script runs out.
    pub fn answering(similarity: f64, is_match: bool) -> Self {
        let comparator = Self::new();
        *lock(&comparator.fallback) = Some(verdict(similarity, is_match));
        comparator
    }

    pub fn push_verdict(&self, similarity: f64, is_match: bool) {
        lock(&self.script).push_back(Ok(verdict(similarity, is_match)));
    }

    pub fn push_error(&self, error: FaceMatchError) {
        lock(&self.script).push_back(Err(error));
    }

    /// Number of comparisons requested.
    pub fn calls(&self) -> usize {
        lock(&self.inputs).len()
    }

    /// Images from the most recent comparison (document, live).
    pub fn last_inputs(&self) -> Option<(EncodedImage, EncodedImage)> {
        lock(&self.inputs).last().cloned()
    }
}

impl Default for NullComparator {
    fn default() -> Self {
        Self::new()
    }
}

fn verdict(similarity: f64, is_match: bool) -> ComparatorVerdict {
    ComparatorVerdict {
        similarity,
        is_match,
        method: Some("null".into()),
    }
}

#[async_trait]
impl FaceComparator for NullComparator {
    fn name(&self) -> &str {
        "null-comparator"
    }

    async fn compare(
        &self,
        document: &EncodedImage,
        live: &EncodedImage,
    ) -> Result<ComparatorVerdict, FaceMatchError> {
        lock(&self.inputs).push((document.clone(), live.clone()));
        if let Some(next) = lock(&self.script).pop_front() {
            return next;
        }
        lock(&self.fallback)
            .clone()
            .ok_or_else(|| FaceMatchError::ComparisonService {
                status: None,
                message: "no scripted verdict".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn script_then_fallback() {
        let comparator = NullComparator::answering(80.0, true);
        comparator.push_verdict(45.0, false);
        let img = EncodedImage::png(vec![1]);
        assert_eq!(comparator.compare(&img, &img).await.unwrap().similarity, 45.0);
        assert_eq!(comparator.compare(&img, &img).await.unwrap().similarity, 80.0);
        assert_eq!(comparator.calls(), 2);
    }

    #[tokio::test]
    async fn empty_script_without_fallback_errors() {
        let comparator = NullComparator::new();
        let img = EncodedImage::png(vec![1]);
        assert!(comparator.compare(&img, &img).await.is_err());
    }
}
