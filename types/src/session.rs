//! The verification session aggregate.
//!
//! Every mutation returns a new [`VerificationSession`]; the receiver is left
//! untouched. Callers replace their held value with the result, so a failed
//! mutation never leaves a half-updated session behind.

use crate::artifact::{
    ArtifactId, DocumentArtifact, DocumentMode, DocumentSide, EncodedImage, LiveEvidence,
    VideoArtifact,
};
use crate::error::SessionError;
use crate::match_result::MatchResult;
use crate::personal::PersonalInfo;

/// Aggregate root of one applicant's verification attempt.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VerificationSession {
    personal: PersonalInfo,
    document_mode: DocumentMode,
    front: Option<DocumentArtifact>,
    back: Option<DocumentArtifact>,
    live: Option<LiveEvidence>,
    match_result: Option<MatchResult>,
    /// Id handed to the next live capture.
    next_artifact: u64,
}

impl VerificationSession {
    /// An empty session collecting documents in `mode`.
    pub fn new(mode: DocumentMode) -> Self {
        Self {
            document_mode: mode,
            next_artifact: 1,
            ..Default::default()
        }
    }

    pub fn personal(&self) -> &PersonalInfo {
        &self.personal
    }

    pub fn document_mode(&self) -> DocumentMode {
        self.document_mode
    }

    pub fn document(&self, side: DocumentSide) -> Option<&DocumentArtifact> {
        match side {
            DocumentSide::Front => self.front.as_ref(),
            DocumentSide::Back => self.back.as_ref(),
        }
    }

    pub fn live(&self) -> Option<&LiveEvidence> {
        self.live.as_ref()
    }

    pub fn live_id(&self) -> Option<ArtifactId> {
        self.live.as_ref().map(LiveEvidence::id)
    }

    pub fn match_result(&self) -> Option<&MatchResult> {
        self.match_result.as_ref()
    }

    /// Replace the personal information.
    pub fn with_personal_info(&self, personal: PersonalInfo) -> Self {
        Self {
            personal,
            ..self.clone()
        }
    }

    /// Switch the document mode. Changing mode drops both sides and any
    /// match result, since the comparison was made against the old front.
    pub fn with_document_mode(&self, mode: DocumentMode) -> Self {
        if mode == self.document_mode {
            return self.clone();
        }
        Self {
            document_mode: mode,
            front: None,
            back: None,
            match_result: None,
            ..self.clone()
        }
    }

    /// Set one side of the document. The artifact must belong to the active
    /// mode. Replacing the front clears the match result.
    pub fn with_document(
        &self,
        side: DocumentSide,
        artifact: DocumentArtifact,
    ) -> Result<Self, SessionError> {
        if artifact.mode() != self.document_mode {
            return Err(SessionError::ModeMismatch {
                expected: self.document_mode,
                found: artifact.mode(),
            });
        }
        let mut next = self.clone();
        match side {
            DocumentSide::Front => {
                next.front = Some(artifact);
                next.match_result = None;
            }
            DocumentSide::Back => next.back = Some(artifact),
        }
        Ok(next)
    }

    /// Remove one side of the document.
    pub fn without_document(&self, side: DocumentSide) -> Self {
        let mut next = self.clone();
        match side {
            DocumentSide::Front => {
                next.front = None;
                next.match_result = None;
            }
            DocumentSide::Back => next.back = None,
        }
        next
    }

    /// Attach a new enhanced still. Any previous match result is dropped in
    /// the same update.
    pub fn with_live_still(&self, image: EncodedImage) -> Self {
        let id = ArtifactId::new(self.next_artifact);
        Self {
            live: Some(LiveEvidence::Still { id, image }),
            match_result: None,
            next_artifact: self.next_artifact + 1,
            ..self.clone()
        }
    }

    /// Attach a new recorded video. Any previous match result is dropped.
    pub fn with_live_video(&self, video: VideoArtifact) -> Self {
        let id = ArtifactId::new(self.next_artifact);
        Self {
            live: Some(LiveEvidence::Video { id, video }),
            match_result: None,
            next_artifact: self.next_artifact + 1,
            ..self.clone()
        }
    }

    /// Discard the live evidence and its match result.
    pub fn without_live(&self) -> Self {
        Self {
            live: None,
            match_result: None,
            ..self.clone()
        }
    }

    pub fn without_match_result(&self) -> Self {
        Self {
            match_result: None,
            ..self.clone()
        }
    }

    /// Attach a match result. Rejected unless it was computed for the
    /// current live still.
    pub fn with_match_result(&self, result: MatchResult) -> Result<Self, SessionError> {
        match &self.live {
            Some(LiveEvidence::Still { id, .. }) if *id == result.artifact() => Ok(Self {
                match_result: Some(result),
                ..self.clone()
            }),
            Some(LiveEvidence::Video { id, .. }) if *id == result.artifact() => {
                Err(SessionError::NotAStillImage)
            }
            _ => Err(SessionError::StaleMatchResult {
                result_for: result.artifact(),
                current: self.live_id(),
            }),
        }
    }
}
