//! The four steps of the guided flow and their descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in the flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Step {
    PersonalInfo,
    Documents,
    LiveEvidence,
    Review,
}

impl Step {
    pub const ALL: [Step; 4] = [
        Step::PersonalInfo,
        Step::Documents,
        Step::LiveEvidence,
        Step::Review,
    ];

    /// 1-based ordinal.
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::PersonalInfo => 1,
            Self::Documents => 2,
            Self::LiveEvidence => 3,
            Self::Review => 4,
        }
    }

    pub fn from_ordinal(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::PersonalInfo),
            2 => Some(Self::Documents),
            3 => Some(Self::LiveEvidence),
            4 => Some(Self::Review),
            _ => None,
        }
    }

    pub fn next(&self) -> Option<Self> {
        Self::from_ordinal(self.ordinal() + 1)
    }

    pub fn prev(&self) -> Option<Self> {
        self.ordinal().checked_sub(1).and_then(Self::from_ordinal)
    }

    /// Steps strictly before this one.
    pub fn predecessors(&self) -> impl Iterator<Item = Step> {
        let ordinal = self.ordinal();
        Self::ALL.into_iter().filter(move |s| s.ordinal() < ordinal)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {}", self.ordinal())
    }
}

/// What kind of live evidence the flow collects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowVariant {
    /// A still selfie compared against the document photo.
    #[default]
    StillPhoto,
    /// A short duration-gated video; no biometric comparison.
    Video,
}

/// The predicate that gates leaving a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepPredicate {
    PersonalInfoComplete,
    DocumentsPresent,
    FaceMatched,
    VideoWithinBounds,
    AllPreviousValid,
}

/// Static description of one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepDescriptor {
    pub step: Step,
    pub title: &'static str,
    pub description: &'static str,
    pub predicate: StepPredicate,
}

impl FlowVariant {
    /// The ordered step descriptors for this variant.
    pub fn steps(&self) -> [StepDescriptor; 4] {
        let live = match self {
            Self::StillPhoto => StepDescriptor {
                step: Step::LiveEvidence,
                title: "Live Photo Verification",
                description: "Take a live selfie for face matching verification with your ID photo",
                predicate: StepPredicate::FaceMatched,
            },
            Self::Video => StepDescriptor {
                step: Step::LiveEvidence,
                title: "Live Video Verification",
                description: "Record a short video of yourself looking at the camera",
                predicate: StepPredicate::VideoWithinBounds,
            },
        };
        [
            StepDescriptor {
                step: Step::PersonalInfo,
                title: "Personal Information",
                description: "Please provide your personal details",
                predicate: StepPredicate::PersonalInfoComplete,
            },
            StepDescriptor {
                step: Step::Documents,
                title: "Driver's License",
                description: "Upload or capture front and back of your driver's license",
                predicate: StepPredicate::DocumentsPresent,
            },
            live,
            StepDescriptor {
                step: Step::Review,
                title: "Review & Submit",
                description: "Review all information and verification results before submitting",
                predicate: StepPredicate::AllPreviousValid,
            },
        ]
    }

    pub fn descriptor(&self, step: Step) -> StepDescriptor {
        self.steps()[usize::from(step.ordinal() - 1)]
    }
}
