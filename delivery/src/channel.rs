use async_trait::async_trait;

use crate::error::DeliveryError;
use crate::payload::SubmissionPayload;

/// Acknowledgement of an accepted submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub channel: String,
    /// HTTP status, for channels that have one.
    pub status: Option<u16>,
    /// Serialized payload size.
    pub bytes: usize,
}

/// Forwards a completed submission to the back office.
#[async_trait]
pub trait SubmissionChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, payload: &SubmissionPayload) -> Result<DeliveryReceipt, DeliveryError>;
}
