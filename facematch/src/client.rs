//! HTTP client for the face comparison service.

use std::time::Duration;

use async_trait::async_trait;
use idgate_types::EncodedImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::comparator::{ComparatorVerdict, FaceComparator};
use crate::error::FaceMatchError;

/// Default timeout for a comparison request. Face detection on two images
/// is slow on the service side.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const COMPARE_PATH: &str = "/api/compare-faces";

/// Comparator backed by the comparison service.
///
/// `POST {base}/api/compare-faces` with both images as data URLs;
/// `GET` on the same path is a liveness probe.
pub struct HttpFaceComparator {
    http_client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct CompareRequest<'a> {
    id_image: &'a str,
    live_image: &'a str,
}

/// Raw JSON body. Failures carry only `success: false` and `error`.
#[derive(Debug, Deserialize)]
struct CompareResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    match_percentage: Option<f64>,
    #[serde(default)]
    is_match: Option<bool>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl HttpFaceComparator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, COMPARE_PATH)
    }

    /// Check that the service answers. Returns its status message.
    pub async fn probe(&self) -> Result<String, FaceMatchError> {
        let response = self
            .http_client
            .get(self.endpoint())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(service_error(response).await);
        }
        let body: ProbeResponse = response.json().await.map_err(|e| {
            FaceMatchError::ComparisonService {
                status: Some(status.as_u16()),
                message: format!("failed to parse probe response: {e}"),
            }
        })?;
        Ok(body
            .message
            .or(body.status)
            .unwrap_or_else(|| status.to_string()))
    }
}

#[async_trait]
impl FaceComparator for HttpFaceComparator {
    fn name(&self) -> &str {
        "http"
    }

    async fn compare(
        &self,
        document: &EncodedImage,
        live: &EncodedImage,
    ) -> Result<ComparatorVerdict, FaceMatchError> {
        let id_image = document.to_data_url();
        let live_image = live.to_data_url();
        let request = CompareRequest {
            id_image: &id_image,
            live_image: &live_image,
        };
        debug!(
            url = %self.endpoint(),
            id_bytes = document.len(),
            live_bytes = live.len(),
            "sending comparison request"
        );

        let response = self
            .http_client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(service_error(response).await);
        }

        let body: CompareResponse = response.json().await.map_err(|e| {
            FaceMatchError::ComparisonService {
                status: Some(status.as_u16()),
                message: format!("failed to parse comparison response: {e}"),
            }
        })?;
        verdict_from(body)
    }
}

fn verdict_from(body: CompareResponse) -> Result<ComparatorVerdict, FaceMatchError> {
    if !body.success {
        return Err(FaceMatchError::ComparisonService {
            status: None,
            message: body.error.unwrap_or_else(|| "Face matching failed".to_string()),
        });
    }
    let similarity = body
        .match_percentage
        .ok_or_else(|| FaceMatchError::ComparisonService {
            status: None,
            message: "response is missing match_percentage".to_string(),
        })?;
    Ok(ComparatorVerdict {
        similarity,
        is_match: body.is_match.unwrap_or(false),
        method: body.method,
    })
}

fn transport_error(e: reqwest::Error) -> FaceMatchError {
    if e.is_timeout() {
        FaceMatchError::Transport(format!("request timed out: {e}"))
    } else if e.is_connect() {
        FaceMatchError::Transport(format!("connection failed: {e}"))
    } else {
        FaceMatchError::Transport(e.to_string())
    }
}

async fn service_error(response: reqwest::Response) -> FaceMatchError {
    let status = response.status();
    let body: ErrorBody = response.json().await.unwrap_or_default();
    let message = body
        .error
        .unwrap_or_else(|| format!("comparison service returned {status}"));
    warn!(status = status.as_u16(), %message, "comparison service rejected request");
    FaceMatchError::ComparisonService {
        status: Some(status.as_u16()),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn images() -> (EncodedImage, EncodedImage) {
        (
            EncodedImage::jpeg(vec![0xFF, 0xD8, 0xFF, 0x01]),
            EncodedImage::png(vec![0x89, b'P', b'N', b'G', 0x02]),
        )
    }

    #[test]
    fn base_url_is_normalised() {
        let client = HttpFaceComparator::new("http://localhost:8000/");
        assert_eq!(client.endpoint(), "http://localhost:8000/api/compare-faces");
    }

    #[test]
    fn success_body_without_method_parses() {
        let body: CompareResponse =
            serde_json::from_str(r#"{"success":true,"match_percentage":74.6,"is_match":true}"#)
                .unwrap();
        let verdict = verdict_from(body).unwrap();
        assert_eq!(verdict.similarity, 74.6);
        assert!(verdict.is_match);
        assert_eq!(verdict.method, None);
    }

    #[test]
    fn unsuccessful_body_is_service_error() {
        let body: CompareResponse =
            serde_json::from_str(r#"{"success":false,"error":"No face detected in ID image"}"#)
                .unwrap();
        assert_eq!(
            verdict_from(body).unwrap_err(),
            FaceMatchError::ComparisonService {
                status: None,
                message: "No face detected in ID image".into(),
            }
        );
    }

    #[tokio::test]
    async fn posts_data_urls_and_reads_verdict() {
        let server = MockServer::start().await;
        let (doc, live) = images();
        Mock::given(method("POST"))
            .and(path("/api/compare-faces"))
            .and(body_partial_json(serde_json::json!({
                "id_image": doc.to_data_url(),
                "live_image": live.to_data_url(),
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "match_percentage": 81.2,
                "is_match": true,
                "method": "face_recognition"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpFaceComparator::new(server.uri());
        let verdict = client.compare(&doc, &live).await.unwrap();
        assert_eq!(verdict.similarity, 81.2);
        assert!(verdict.is_match);
        assert_eq!(verdict.method.as_deref(), Some("face_recognition"));
    }

    #[tokio::test]
    async fn non_success_status_carries_upstream_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/compare-faces"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(serde_json::json!({"error": "Could not find a face"})),
            )
            .mount(&server)
            .await;

        let (doc, live) = images();
        let err = HttpFaceComparator::new(server.uri())
            .compare(&doc, &live)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FaceMatchError::ComparisonService {
                status: Some(422),
                message: "Could not find a face".into(),
            }
        );
    }

    #[tokio::test]
    async fn non_json_error_body_falls_back_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let (doc, live) = images();
        let err = HttpFaceComparator::new(server.uri())
            .compare(&doc, &live)
            .await
            .unwrap_err();
        match err {
            FaceMatchError::ComparisonService { status, message } => {
                assert_eq!(status, Some(500));
                assert!(message.contains("500"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_service_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(500))
                    .set_body_json(serde_json::json!({"success": true, "match_percentage": 90.0})),
            )
            .mount(&server)
            .await;

        let (doc, live) = images();
        let err = HttpFaceComparator::with_timeout(server.uri(), Duration::from_millis(50))
            .compare(&doc, &live)
            .await
            .unwrap_err();
        assert!(matches!(err, FaceMatchError::Transport(_)));
    }

    #[tokio::test]
    async fn unreachable_service_is_transport_error() {
        let (doc, live) = images();
        let err = HttpFaceComparator::new("http://127.0.0.1:1")
            .compare(&doc, &live)
            .await
            .unwrap_err();
        assert!(matches!(err, FaceMatchError::Transport(_)));
    }

    #[tokio::test]
    async fn probe_returns_service_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/compare-faces"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "Compare faces API endpoint is working",
                "status": "active"
            })))
            .mount(&server)
            .await;

        let message = HttpFaceComparator::new(server.uri()).probe().await.unwrap();
        assert_eq!(message, "Compare faces API endpoint is working");
    }
}
