use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::image_gen::orchestrator::OrchestrationError;
use crate::image_gen::GenerationError;
use crate::portrait::pipeline::PipelineError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Portrait pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg.clone())
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Pipeline(e) => pipeline_failure(e),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

/// Pipeline failures are already logged with their context by the pipeline itself.
fn pipeline_failure(e: &PipelineError) -> (StatusCode, &'static str, String) {
    let server_error =
        |code: &'static str, message: String| (StatusCode::INTERNAL_SERVER_ERROR, code, message);
    match e {
        PipelineError::MissingSelection => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
        }
        PipelineError::Orchestration(inner) => match inner {
            OrchestrationError::UpstreamJob { message, .. } => server_error(
                "GENERATION_FAILED",
                format!("Portrait generation failed: {message}"),
            ),
            OrchestrationError::Timeout { .. } => server_error(
                "GENERATION_TIMEOUT",
                "Portrait generation did not finish in time, please try again".to_string(),
            ),
            OrchestrationError::Normalization { .. } => server_error(
                "GENERATION_OUTPUT_INVALID",
                "The image service returned an unrecognised result".to_string(),
            ),
            OrchestrationError::Service(GenerationError::Http(_)) => server_error(
                "GENERATION_UNAVAILABLE",
                "The image service could not be reached".to_string(),
            ),
            OrchestrationError::Service(GenerationError::Api { .. }) => server_error(
                "GENERATION_REJECTED",
                "The image service rejected the request".to_string(),
            ),
            OrchestrationError::Service(GenerationError::Parse(_)) => server_error(
                "GENERATION_UNREADABLE",
                "The image service returned an unreadable response".to_string(),
            ),
        },
        PipelineError::Imaging(_) => server_error(
            "IMAGE_PROCESSING_FAILED",
            "The generated image could not be processed".to_string(),
        ),
        PipelineError::Storage(_) => server_error(
            "STORAGE_ERROR",
            "The generated image could not be stored".to_string(),
        ),
    }
}
