//! Notifications raised by the flow controller.

use std::time::Duration;

use idgate_delivery::{DeliveryError, DeliveryReceipt};
use idgate_facematch::FaceMatchError;
use idgate_types::{ArtifactId, DocumentMode, DocumentSide, Step};

/// Something the presentation layer may want to react to.
///
/// Events queue up inside the flow until drained.
#[derive(Clone, Debug, PartialEq)]
pub enum FlowEvent {
    StepChanged { from: Step, to: Step },
    CameraStarted { step: Step },
    CameraStopped,
    DocumentStored { side: DocumentSide, mode: DocumentMode },
    DocumentRemoved { side: DocumentSide },
    DocumentModeChanged { mode: DocumentMode },
    LiveCaptured { artifact: ArtifactId },
    VideoRecorded { artifact: ArtifactId, duration: Duration },
    LiveDiscarded,
    /// A previous match result no longer applies.
    MatchCleared,
    ComparisonStarted { artifact: ArtifactId },
    MatchAccepted { artifact: ArtifactId, score: u8 },
    MatchRejected { artifact: ArtifactId, score: u8 },
    ComparisonFailed { artifact: ArtifactId, error: FaceMatchError },
    /// A comparison finished for evidence that has since been replaced.
    StaleResultDiscarded {
        result_for: ArtifactId,
        current: Option<ArtifactId>,
    },
    /// The comparator's verdict and the score threshold disagree.
    VerdictDisagreement { artifact: ArtifactId, score: u8, verdict: bool },
    Submitted { receipt: DeliveryReceipt },
    SubmissionFailed { error: DeliveryError },
}
