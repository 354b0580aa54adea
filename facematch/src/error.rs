use idgate_types::ArtifactId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FaceMatchError {
    #[error("invalid comparison input: {0}")]
    InvalidInput(String),

    #[error("comparison service error{}: {message}", status_suffix(.status))]
    ComparisonService { status: Option<u16>, message: String },

    #[error("comparison service unreachable: {0}")]
    Transport(String),

    #[error("a comparison for {0} is still running")]
    AttemptInProgress(ArtifactId),
}

impl FaceMatchError {
    /// Actionable text to show the applicant.
    pub fn guidance(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "Please capture a new photo and try again.",
            Self::ComparisonService { .. } if self.is_retryable() => {
                "The verification service is temporarily unavailable. Please try again shortly."
            }
            Self::ComparisonService { .. } => {
                "Face matching failed. Please ensure good lighting and look directly at the camera."
            }
            Self::Transport(_) => {
                "The verification service could not be reached. Check your connection and retry."
            }
            Self::AttemptInProgress(_) => "Verification is already in progress.",
        }
    }

    /// Whether retrying the same inputs may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::AttemptInProgress(_))
            || matches!(self, Self::ComparisonService { status: Some(s), .. } if *s >= 500)
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_mentions_status_when_known() {
        let with = FaceMatchError::ComparisonService {
            status: Some(502),
            message: "bad gateway".into(),
        };
        assert_eq!(with.to_string(), "comparison service error (502): bad gateway");
        let without = FaceMatchError::ComparisonService {
            status: None,
            message: "no face detected".into(),
        };
        assert_eq!(without.to_string(), "comparison service error: no face detected");
    }

    #[test]
    fn retryable_classification() {
        assert!(FaceMatchError::Transport("timeout".into()).is_retryable());
        assert!(!FaceMatchError::InvalidInput("empty".into()).is_retryable());
        assert!(!FaceMatchError::ComparisonService { status: Some(400), message: String::new() }
            .is_retryable());
    }

    #[test]
    fn server_side_failures_ask_for_a_retry() {
        let unavailable = FaceMatchError::ComparisonService {
            status: Some(503),
            message: "unavailable".into(),
        };
        let rejected = FaceMatchError::ComparisonService {
            status: Some(422),
            message: "no face detected".into(),
        };
        assert!(unavailable.guidance().contains("try again"));
        assert!(rejected.guidance().contains("good lighting"));
        assert!(!FaceMatchError::ComparisonService { status: None, message: String::new() }
            .is_retryable());
    }
}
