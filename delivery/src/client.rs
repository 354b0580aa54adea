//! HTTP delivery of submission payloads.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{info, warn};

use crate::channel::{DeliveryReceipt, SubmissionChannel};
use crate::error::{DeliveryError, DeliveryFailure};
use crate::payload::SubmissionPayload;

/// Default timeout for a submission. Payloads carry several images.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts the payload as JSON to a fixed endpoint.
///
/// The receiver acknowledges with a redirect to its thank-you page, so
/// redirects are not followed and any 2xx or 3xx status counts as accepted.
pub struct HttpDeliveryChannel {
    http_client: reqwest::Client,
    url: String,
    max_payload_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

impl HttpDeliveryChannel {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .redirect(Policy::none())
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            url: url.into(),
            max_payload_bytes: None,
        }
    }

    /// Refuse payloads above `limit` bytes before sending them.
    pub fn with_max_payload(mut self, limit: usize) -> Self {
        self.max_payload_bytes = Some(limit);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SubmissionChannel for HttpDeliveryChannel {
    fn name(&self) -> &str {
        "http"
    }

    async fn deliver(&self, payload: &SubmissionPayload) -> Result<DeliveryReceipt, DeliveryError> {
        let body = payload.to_json()?;
        let size = body.len();
        if let Some(limit) = self.max_payload_bytes {
            if size > limit {
                warn!(size, limit, "payload exceeds local limit, not sending");
                return Err(DeliveryError::PayloadTooLarge {
                    size,
                    limit: Some(limit),
                });
            }
        }

        let response = self
            .http_client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                let msg = if e.is_timeout() {
                    format!("request timed out: {e}")
                } else if e.is_connect() {
                    format!("connection failed: {e}")
                } else {
                    e.to_string()
                };
                DeliveryError::DeliveryFailed(DeliveryFailure::Transport(msg))
            })?;

        let status = response.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            warn!(size, "receiver rejected payload as too large");
            return Err(DeliveryError::PayloadTooLarge { size, limit: None });
        }
        if status.is_success() || status.is_redirection() {
            info!(status = status.as_u16(), size, "submission delivered");
            return Ok(DeliveryReceipt {
                channel: self.name().to_string(),
                status: Some(status.as_u16()),
                bytes: size,
            });
        }

        let body: ErrorBody = response.json().await.unwrap_or_default();
        let message = body
            .error
            .or(body.details)
            .unwrap_or_else(|| format!("Server error: {status}"));
        warn!(status = status.as_u16(), %message, "submission rejected");
        Err(DeliveryError::DeliveryFailed(DeliveryFailure::Server {
            status: status.as_u16(),
            message,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use idgate_types::{DocumentMode, PersonalInfo, VerificationSession};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payload() -> SubmissionPayload {
        let session = VerificationSession::new(DocumentMode::Upload).with_personal_info(PersonalInfo {
            full_name: "Ana Reyes".into(),
            email: "ana@example.com".into(),
            phone: "09171234567".into(),
            ..Default::default()
        });
        SubmissionPayload::assemble(
            &session,
            Vec::new(),
            Utc.with_ymd_and_hms(2026, 5, 5, 12, 0, 0).unwrap(),
        )
        .unwrap()
    }

    async fn channel_answering(template: ResponseTemplate) -> (MockServer, HttpDeliveryChannel) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/stepper-form"))
            .respond_with(template)
            .mount(&server)
            .await;
        let channel = HttpDeliveryChannel::new(format!("{}/api/stepper-form", server.uri()));
        (server, channel)
    }

    #[tokio::test]
    async fn redirect_counts_as_delivered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/stepper-form"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(serde_json::json!({
                "fullName": "Ana Reyes",
                "subject": "New Identity Verification - Ana Reyes"
            })))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/thank-you"))
            .expect(1)
            .mount(&server)
            .await;

        let channel = HttpDeliveryChannel::new(format!("{}/api/stepper-form", server.uri()));
        let receipt = channel.deliver(&payload()).await.unwrap();
        assert_eq!(receipt.status, Some(302));
        assert!(receipt.bytes > 0);
    }

    #[tokio::test]
    async fn ok_json_counts_as_delivered() {
        let (_server, channel) =
            channel_answering(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
                .await;
        assert_eq!(channel.deliver(&payload()).await.unwrap().status, Some(200));
    }

    #[tokio::test]
    async fn status_413_is_payload_too_large() {
        let (_server, channel) = channel_answering(ResponseTemplate::new(413)).await;
        let err = channel.deliver(&payload()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::PayloadTooLarge { limit: None, .. }));
    }

    #[tokio::test]
    async fn server_error_carries_message() {
        let (_server, channel) = channel_answering(ResponseTemplate::new(500).set_body_json(
            serde_json::json!({"error": "Failed to submit verification request"}),
        ))
        .await;
        let err = channel.deliver(&payload()).await.unwrap_err();
        assert_eq!(
            err,
            DeliveryError::DeliveryFailed(DeliveryFailure::Server {
                status: 500,
                message: "Failed to submit verification request".into(),
            })
        );
    }

    #[tokio::test]
    async fn local_limit_is_enforced_before_sending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let channel = HttpDeliveryChannel::new(server.uri()).with_max_payload(16);
        let err = channel.deliver(&payload()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::PayloadTooLarge { limit: Some(16), .. }));
    }

    #[tokio::test]
    async fn unreachable_receiver_is_transport_failure() {
        let channel = HttpDeliveryChannel::new("http://127.0.0.1:1/api/stepper-form");
        let err = channel.deliver(&payload()).await.unwrap_err();
        assert!(matches!(
            err,
            DeliveryError::DeliveryFailed(DeliveryFailure::Transport(_))
        ));
    }
}
