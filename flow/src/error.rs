use idgate_capture::CaptureError;
use idgate_delivery::DeliveryError;
use idgate_facematch::FaceMatchError;
use idgate_preprocess::PreprocessError;
use idgate_types::{FlowVariant, SessionError, Step};
use thiserror::Error;

use crate::validation::ValidationIssue;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("image error: {0}")]
    Preprocess(#[from] PreprocessError),

    #[error("face match error: {0}")]
    FaceMatch(#[from] FaceMatchError),

    #[error("submission error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("{step} is incomplete: {}", join_issues(.issues))]
    ValidationFailed {
        step: Step,
        issues: Vec<ValidationIssue>,
    },

    #[error("operation requires {expected}, flow is at {current}")]
    WrongStep { expected: Step, current: Step },

    #[error("{target} is locked until {blocking} is complete")]
    StepLocked { target: Step, blocking: Step },

    #[error("already at the final step")]
    AtFinalStep,

    #[error("already at the first step")]
    AtFirstStep,

    #[error("the camera is not used in {0}")]
    CameraNotUsed(Step),

    #[error("operation is not available in the {0:?} flow")]
    WrongVariant(FlowVariant),

    #[error("no live evidence captured")]
    NoLiveEvidence,

    #[error("config error: {0}")]
    Config(String),
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl FlowError {
    /// Text to show the applicant, when the error has any.
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            Self::Capture(e) => Some(e.guidance()),
            Self::FaceMatch(e) => Some(e.guidance()),
            Self::Delivery(e) => Some(e.guidance()),
            Self::Preprocess(PreprocessError::UploadRejected(_)) => {
                Some("Please upload a PNG, JPG or JPEG image between 1KB and 3MB.")
            }
            Self::ValidationFailed { .. } | Self::StepLocked { .. } => {
                Some("Please complete all required fields before continuing.")
            }
            _ => None,
        }
    }
}
