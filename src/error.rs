use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::validation::FieldError;

pub type AppResult<T> = Result<T, AppError>;

/// Domain failures surfaced to API callers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("validation failed: {} errors", .0.len())]
    Validation(Vec<FieldError>),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status_code: u16,
    message: serde_json::Value,
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let reason = status.canonical_reason().unwrap_or("Error");

        let (message, errors) = match self {
            AppError::Validation(fields) => {
                let messages: Vec<&str> = fields.iter().map(|f| f.message.as_str()).collect();
                (json!(messages), Some(fields))
            }
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                (json!("Internal server error"), None)
            }
            other => (json!(other.to_string()), None),
        };

        let body = ErrorBody {
            status_code: status.as_u16(),
            message,
            error: reason,
            errors,
        };
        (status, Json(body)).into_response()
    }
}
