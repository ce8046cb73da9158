use askdb::PromptError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

/// A custom error type for the server application.
///
/// Every variant renders as `{ "success": false, "kind": ..., "message": ... }`.
pub enum AppError {
    /// Errors originating from the `askdb` pipeline.
    Prompt(PromptError),
    /// The request itself is unusable.
    BadRequest(String),
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

/// Conversion from `PromptError` to `AppError`.
impl From<PromptError> for AppError {
    fn from(err: PromptError) -> Self {
        AppError::Prompt(err)
    }
}

/// Conversion from `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

/// Maps an error category to its HTTP status.
pub fn status_for_kind(kind: &str) -> StatusCode {
    match kind {
        "validation_rejected" | "bad_request" => StatusCode::BAD_REQUEST,
        "execution" => StatusCode::UNPROCESSABLE_ENTITY,
        "upstream_generation" => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (kind, message) = match self {
            AppError::Prompt(err) => {
                let kind = err.kind();
                if kind == "validation_rejected" {
                    warn!("PromptError: {:?}", err);
                } else {
                    error!("PromptError: {:?}", err);
                }
                (kind, err.to_string())
            }
            AppError::BadRequest(message) => {
                warn!("Bad request: {message}");
                ("bad_request", message)
            }
            AppError::Internal(err) => {
                error!("Internal server error: {:?}", err);
                ("internal", "An internal server error occurred.".to_string())
            }
        };

        let body = Json(json!({
            "success": false,
            "kind": kind,
            "message": message,
        }));

        (status_for_kind(kind), body).into_response()
    }
}
