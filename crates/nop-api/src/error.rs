use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use nop_db::DbError;
use nop_types::api::ErrorResponse;

/// Errors a handler can answer with. Each maps to one status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    /// Request body fields that failed validation or reference missing rows.
    #[error("invalid request")]
    Invalid(Vec<String>),

    #[error("unauthorized")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal server error")]
    Internal,
}

impl ApiError {
    pub fn invalid(field: &str) -> Self {
        Self::Invalid(vec![field.to_string()])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { message } => Self::NotFound(message),
            DbError::Constraint { message } => Self::Conflict(message),
            other => {
                error!("Database error: {}", other);
                Self::Internal
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let detail = rejection.body_text();
        match rejection {
            JsonRejection::JsonDataError(_) => match rejected_field(&detail) {
                Some(field) => Self::Invalid(vec![field]),
                None => Self::BadRequest(detail),
            },
            _ => Self::BadRequest(detail),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Name of the body field a deserialization error is about, if it names one.
fn rejected_field(detail: &str) -> Option<String> {
    for marker in ["missing field `", "unknown field `"] {
        if let Some((_, rest)) = detail.split_once(marker) {
            return rest.split('`').next().map(str::to_string);
        }
    }

    // Type errors are reported as "<path>: invalid type: ...".
    let detail = detail
        .strip_prefix("Failed to deserialize the JSON body into the target type: ")
        .unwrap_or(detail);
    let (path, _) = detail.split_once(": ")?;
    let is_path = path.chars().any(|c| c.is_alphanumeric())
        && path
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'));
    is_path.then(|| path.to_string())
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            message: self.to_string(),
            invalid: match self {
                Self::Invalid(fields) => Some(fields),
                _ => None,
            },
        };
        (status, Json(body)).into_response()
    }
}
