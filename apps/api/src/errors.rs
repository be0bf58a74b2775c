use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;

/// Application-level error type.
///
/// Route-level failures (unknown content kind) are returned to the client via
/// `IntoResponse`. Failures inside a triggered flow never leave it: the flow
/// turns them into the text shown in the output fields.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Llm(#[from] LlmError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Llm(e) => {
                tracing::error!("LLM error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "The language model provider returned an error".to_string(),
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
