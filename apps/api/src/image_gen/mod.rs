//! Image generation client: the single point of entry for the remote generative-image
//! service (Replicate predictions API).
//!
//! ARCHITECTURAL RULE: No other module may call the generation service directly.
//! Everything goes through `GenerationService`, and polling goes through `orchestrator`.
//!
//! The client makes exactly one attempt per call. The orchestrator's bounded poll loop is
//! the only retry in the pipeline.

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

pub mod normalizer;
pub mod orchestrator;

use crate::image_gen::normalizer::RawOutput;

pub const DEFAULT_API_BASE: &str = "https://api.replicate.com/v1";
/// Job id reported for results the service streamed back inline without a prediction id.
pub const INLINE_JOB_ID: &str = "inline";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Lifecycle status of a generation job as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

impl JobStatus {
    /// Maps the service's status vocabulary. Unknown values are treated as still running.
    pub fn from_service(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "starting" | "pending" | "queued" => JobStatus::Pending,
            "succeeded" | "successful" | "completed" => JobStatus::Succeeded,
            "failed" | "error" => JobStatus::Failed,
            "canceled" | "cancelled" | "aborted" => JobStatus::Canceled,
            _ => JobStatus::Processing,
        }
    }
}

/// One remote generation job, as last observed.
#[derive(Debug)]
pub struct GenerationJob {
    pub id: String,
    pub status: JobStatus,
    pub raw_output: Option<RawOutput>,
    pub error_message: Option<String>,
}

/// A model invocation: `owner/name` (latest version) or `owner/name:version`.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub input: Map<String, Value>,
}

/// Remote generative-image service: create a job, then look it up by id.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn create_job(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationJob, GenerationError>;

    async fn get_job(&self, job_id: &str) -> Result<GenerationJob, GenerationError>;
}

#[derive(Debug, Serialize)]
struct CreatePredictionBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
    input: &'a Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl From<Prediction> for GenerationJob {
    fn from(prediction: Prediction) -> Self {
        let error_message = match prediction.error {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            Some(Value::Null) | None => None,
            Some(Value::String(_)) => None,
            Some(other) => Some(other.to_string()),
        };
        GenerationJob {
            id: prediction.id,
            status: JobStatus::from_service(&prediction.status),
            raw_output: prediction
                .output
                .filter(|v| !v.is_null())
                .map(RawOutput::from_json),
            error_message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    detail: String,
}

#[derive(Clone)]
pub struct ReplicateClient {
    client: Client,
    api_base: String,
    api_token: String,
}

impl ReplicateClient {
    pub fn new(client: Client, api_base: &str, api_token: String) -> Self {
        Self {
            client,
            api_base: api_base.trim().trim_end_matches('/').to_string(),
            api_token,
        }
    }

    /// Versioned models go through `/predictions`; bare `owner/name` models through the
    /// model-scoped endpoint.
    fn create_endpoint<'a>(&self, model: &'a str) -> (String, Option<&'a str>) {
        match model.split_once(':') {
            Some((_, version)) => (format!("{}/predictions", self.api_base), Some(version)),
            None => (format!("{}/models/{}/predictions", self.api_base, model), None),
        }
    }

    async fn read_job(response: Response) -> Result<GenerationJob, GenerationError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.detail)
                .unwrap_or(body);
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let is_image = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("image/"));

        if is_image {
            // The service answered with the image itself: already terminal.
            let stream = response.bytes_stream().map_err(std::io::Error::other);
            return Ok(GenerationJob {
                id: INLINE_JOB_ID.to_string(),
                status: JobStatus::Succeeded,
                raw_output: Some(RawOutput::Chunks(stream.boxed())),
                error_message: None,
            });
        }

        let body = response.text().await?;
        let prediction: Prediction = serde_json::from_str(&body)?;
        Ok(prediction.into())
    }
}

#[async_trait]
impl GenerationService for ReplicateClient {
    async fn create_job(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationJob, GenerationError> {
        let (endpoint, version) = self.create_endpoint(&request.model);
        let body = CreatePredictionBody {
            version,
            input: &request.input,
        };

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_token)
            .header("Prefer", "wait")
            .json(&body)
            .send()
            .await?;

        let job = Self::read_job(response).await?;
        debug!(
            "Created generation job {} for model {} (status {:?})",
            job.id, request.model, job.status
        );
        Ok(job)
    }

    async fn get_job(&self, job_id: &str) -> Result<GenerationJob, GenerationError> {
        let response = self
            .client
            .get(format!("{}/predictions/{}", self.api_base, job_id))
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        Self::read_job(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_gen::normalizer::normalize;
    use crate::imaging::source::ImageSource;
    use crate::test_support::{CannedResponse, StubServer};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    fn client() -> ReplicateClient {
        ReplicateClient::new(Client::new(), "https://api.example.com/v1/", "token".to_string())
    }

    #[test]
    fn test_status_vocabulary() {
        assert_eq!(JobStatus::from_service("starting"), JobStatus::Pending);
        assert_eq!(JobStatus::from_service("processing"), JobStatus::Processing);
        assert_eq!(JobStatus::from_service("SUCCEEDED"), JobStatus::Succeeded);
        assert_eq!(JobStatus::from_service("failed"), JobStatus::Failed);
        assert_eq!(JobStatus::from_service("canceled"), JobStatus::Canceled);
        assert_eq!(JobStatus::from_service("warming-up"), JobStatus::Processing);
    }

    #[test]
    fn test_create_endpoint_for_versioned_model() {
        let (endpoint, version) = client().create_endpoint("acme/remover:abc123");
        assert_eq!(endpoint, "https://api.example.com/v1/predictions");
        assert_eq!(version, Some("abc123"));
    }

    #[test]
    fn test_create_endpoint_for_official_model() {
        let (endpoint, version) = client().create_endpoint("acme/portrait");
        assert_eq!(
            endpoint,
            "https://api.example.com/v1/models/acme/portrait/predictions"
        );
        assert_eq!(version, None);
    }

    #[test]
    fn test_prediction_maps_to_job() {
        let prediction: Prediction = serde_json::from_value(json!({
            "id": "p-1",
            "status": "succeeded",
            "output": ["https://cdn.example.com/out.png"],
            "error": null
        }))
        .unwrap();
        let job: GenerationJob = prediction.into();
        assert_eq!(job.id, "p-1");
        assert_eq!(job.status, JobStatus::Succeeded);
        assert!(matches!(job.raw_output, Some(RawOutput::List(_))));
        assert!(job.error_message.is_none());
    }

    #[test]
    fn test_prediction_error_text_is_kept() {
        let prediction: Prediction = serde_json::from_value(json!({
            "id": "p-2",
            "status": "failed",
            "output": null,
            "error": "NSFW content detected"
        }))
        .unwrap();
        let job: GenerationJob = prediction.into();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.raw_output.is_none());
        assert_eq!(job.error_message.as_deref(), Some("NSFW content detected"));
    }

    #[test]
    fn test_create_body_omits_version_for_official_models() {
        let input = json!({"prompt": "hi"}).as_object().cloned().unwrap();
        let body = CreatePredictionBody {
            version: None,
            input: &input,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value, json!({"input": {"prompt": "hi"}}));
    }

    fn client_for(server: &StubServer) -> ReplicateClient {
        ReplicateClient::new(
            Client::new(),
            &format!("{}/v1", server.base_url),
            "token".to_string(),
        )
    }

    fn portrait_request() -> GenerationRequest {
        GenerationRequest {
            model: "acme/portrait".to_string(),
            input: json!({"prompt": "studio headshot"}).as_object().cloned().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_inline_image_response_is_a_finished_job() {
        let server = StubServer::start(|_| {
            CannedResponse::new(StatusCode::CREATED, "image/png", b"\x89PNG-inline".to_vec())
        })
        .await;

        let job = client_for(&server)
            .create_job(&portrait_request())
            .await
            .unwrap();
        assert_eq!(job.id, INLINE_JOB_ID);
        assert_eq!(job.status, JobStatus::Succeeded);
        assert!(job.error_message.is_none());

        let raw = job.raw_output.unwrap();
        assert_eq!(raw.kind(), "chunked stream");
        match normalize(raw).await.unwrap() {
            ImageSource::Bytes(bytes) => assert_eq!(&bytes[..], b"\x89PNG-inline"),
            ImageSource::Url(url) => panic!("expected inline bytes, got {url}"),
        }

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        let create = &requests[0];
        assert_eq!(create.method, Method::POST);
        assert_eq!(create.path, "/v1/models/acme/portrait/predictions");
        assert_eq!(create.header("authorization"), Some("Bearer token"));
        assert_eq!(create.header("prefer"), Some("wait"));
        let sent: Value = serde_json::from_slice(&create.body).unwrap();
        assert_eq!(sent, json!({"input": {"prompt": "studio headshot"}}));
    }

    #[tokio::test]
    async fn test_api_error_uses_detail_field() {
        let server = StubServer::start(|_| {
            CannedResponse::json(
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({"detail": "Invalid version or not permitted"}),
            )
        })
        .await;

        let err = client_for(&server)
            .create_job(&portrait_request())
            .await
            .unwrap_err();
        match err {
            GenerationError::Api { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "Invalid version or not permitted");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_api_error_keeps_unstructured_body() {
        let server = StubServer::start(|_| {
            CannedResponse::new(StatusCode::BAD_GATEWAY, "text/plain", "upstream unavailable")
        })
        .await;

        let err = client_for(&server).get_job("p-1").await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Api { status: 502, ref message } if message == "upstream unavailable"
        ));
    }

    #[tokio::test]
    async fn test_get_job_reads_prediction() {
        let server = StubServer::start(|_| {
            CannedResponse::json(
                StatusCode::OK,
                json!({
                    "id": "p-1",
                    "status": "processing",
                    "output": null,
                    "error": null
                }),
            )
        })
        .await;

        let job = client_for(&server).get_job("p-1").await.unwrap();
        assert_eq!(job.id, "p-1");
        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.raw_output.is_none());

        let lookup = &server.requests()[0];
        assert_eq!(lookup.method, Method::GET);
        assert_eq!(lookup.path, "/v1/predictions/p-1");
        assert_eq!(lookup.header("authorization"), Some("Bearer token"));
    }

    #[tokio::test]
    async fn test_unreadable_success_body_is_a_parse_error() {
        let server = StubServer::start(|_| {
            CannedResponse::new(StatusCode::OK, "application/json", "{not json")
        })
        .await;

        let err = client_for(&server).get_job("p-1").await.unwrap_err();
        assert!(matches!(err, GenerationError::Parse(_)));
    }
}
