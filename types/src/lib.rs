//! Fundamental types for the identity verification pipeline.
//!
//! This crate defines the data model shared by every other crate in the
//! workspace: the [`VerificationSession`] aggregate, document and live-evidence
//! artifacts, the [`MatchResult`] produced by a face comparison, and the step
//! descriptors of the guided flow.

pub mod artifact;
pub mod error;
pub mod match_result;
pub mod personal;
pub mod session;
pub mod step;

pub use artifact::{
    ArtifactId, DocumentArtifact, DocumentMode, DocumentSide, EncodedImage, ImageMime,
    LiveEvidence, UploadedFile, VideoArtifact,
};
pub use error::SessionError;
pub use match_result::{MatchResult, DEFAULT_METHOD, MATCH_THRESHOLD};
pub use personal::{PersonalField, PersonalInfo};
pub use session::VerificationSession;
pub use step::{FlowVariant, Step, StepDescriptor, StepPredicate};
