use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("payload of {size} bytes is too large{}", limit_suffix(.limit))]
    PayloadTooLarge { size: usize, limit: Option<usize> },

    #[error("delivery failed: {0}")]
    DeliveryFailed(DeliveryFailure),

    #[error("incomplete submission: {0}")]
    IncompletePayload(String),

    #[error("payload serialization failed: {0}")]
    Serialize(String),
}

/// Why the channel did not accept a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// The request never produced a response.
    Transport(String),
    /// The receiver answered with an error status.
    Server { status: u16, message: String },
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Server { status, message } => write!(f, "server error {status}: {message}"),
        }
    }
}

fn limit_suffix(limit: &Option<usize>) -> String {
    limit.map(|l| format!(" (limit {l} bytes)")).unwrap_or_default()
}

impl DeliveryError {
    /// Actionable text to show the applicant.
    pub fn guidance(&self) -> &'static str {
        match self {
            Self::PayloadTooLarge { .. } => {
                "Files too large. Please use smaller images or capture photos instead of uploading."
            }
            Self::DeliveryFailed(DeliveryFailure::Transport(_)) => {
                "Could not reach the server. Check your connection and submit again."
            }
            Self::DeliveryFailed(DeliveryFailure::Server { .. }) => {
                "Failed to submit verification request. Please try again."
            }
            Self::IncompletePayload(_) => "Name, email, and phone are required.",
            Self::Serialize(_) => "Failed to prepare the submission. Please try again.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_large_mentions_local_limit() {
        let local = DeliveryError::PayloadTooLarge { size: 10, limit: Some(5) };
        assert_eq!(local.to_string(), "payload of 10 bytes is too large (limit 5 bytes)");
        let remote = DeliveryError::PayloadTooLarge { size: 10, limit: None };
        assert_eq!(remote.to_string(), "payload of 10 bytes is too large");
    }

    #[test]
    fn failure_cause_is_displayed() {
        let err = DeliveryError::DeliveryFailed(DeliveryFailure::Server {
            status: 500,
            message: "Failed to submit verification request".into(),
        });
        assert_eq!(
            err.to_string(),
            "delivery failed: server error 500: Failed to submit verification request"
        );
    }
}
