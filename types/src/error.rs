//! Errors raised when a session mutation would break an aggregate invariant.

use thiserror::Error;

use crate::artifact::{ArtifactId, DocumentMode};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session is in {expected} mode but a {found} document was supplied")]
    ModeMismatch {
        expected: DocumentMode,
        found: DocumentMode,
    },

    #[error("match result for {result_for} does not belong to the current live artifact ({current:?})")]
    StaleMatchResult {
        result_for: ArtifactId,
        current: Option<ArtifactId>,
    },

    #[error("match results only apply to still live images")]
    NotAStillImage,
}
