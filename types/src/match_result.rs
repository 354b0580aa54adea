//! Outcome of one face-similarity comparison.

use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactId;

/// Minimum rounded similarity percentage for an accepted match.
pub const MATCH_THRESHOLD: u8 = 60;

/// Method label used when the comparator does not report one.
pub const DEFAULT_METHOD: &str = "face_recognition";

/// The decision derived from a comparator response.
///
/// `is_match` holds only when the comparator's own verdict is positive and
/// the rounded score reaches [`MATCH_THRESHOLD`]. Fields are private so the
/// conjunction cannot be bypassed after construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    artifact: ArtifactId,
    match_percentage: u8,
    similarity: f64,
    verdict: bool,
    is_match: bool,
    method: String,
}

impl MatchResult {
    /// Combine a raw comparator response into a decision for `artifact`.
    ///
    /// The similarity is rounded and clamped to `0..=100`; a non-finite value
    /// scores zero.
    pub fn decide(
        artifact: ArtifactId,
        similarity: f64,
        verdict: bool,
        method: impl Into<String>,
    ) -> Self {
        let match_percentage = if similarity.is_finite() {
            similarity.round().clamp(0.0, 100.0) as u8
        } else {
            0
        };
        let method = method.into();
        let method = if method.trim().is_empty() {
            DEFAULT_METHOD.to_string()
        } else {
            method
        };
        Self {
            artifact,
            match_percentage,
            similarity,
            verdict,
            is_match: verdict && match_percentage >= MATCH_THRESHOLD,
            method,
        }
    }

    /// The live artifact this comparison was run against.
    pub fn artifact(&self) -> ArtifactId {
        self.artifact
    }

    /// Rounded similarity percentage in `0..=100`.
    pub fn score(&self) -> u8 {
        self.match_percentage
    }

    pub fn verdict(&self) -> bool {
        self.verdict
    }

    pub fn is_match(&self) -> bool {
        self.is_match
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// True when the upstream verdict and the local threshold disagree,
    /// e.g. verdict `false` at score 70.
    pub fn verdict_disagrees(&self) -> bool {
        self.verdict != (self.match_percentage >= MATCH_THRESHOLD)
    }
}
