//! Nullable submission channel: records payloads instead of sending them.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use idgate_delivery::{DeliveryError, DeliveryReceipt, SubmissionChannel, SubmissionPayload};

use crate::lock;

pub struct NullSubmissionChannel {
    delivered: Mutex<Vec<SubmissionPayload>>,
    failures: Mutex<VecDeque<DeliveryError>>,
}

impl NullSubmissionChannel {
    pub fn new() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
        }
    }

    /// Fail the next delivery with `error`.
    pub fn fail_next(&self, error: DeliveryError) {
        lock(&self.failures).push_back(error);
    }

    /// Payloads accepted so far (for assertions).
    pub fn delivered(&self) -> Vec<SubmissionPayload> {
        lock(&self.delivered).clone()
    }
}

impl Default for NullSubmissionChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubmissionChannel for NullSubmissionChannel {
    fn name(&self) -> &str {
        "null-channel"
    }

    async fn deliver(&self, payload: &SubmissionPayload) -> Result<DeliveryReceipt, DeliveryError> {
        if let Some(err) = lock(&self.failures).pop_front() {
            return Err(err);
        }
        let bytes = payload.to_json()?.len();
        lock(&self.delivered).push(payload.clone());
        Ok(DeliveryReceipt {
            channel: self.name().to_string(),
            status: None,
            bytes,
        })
    }
}
