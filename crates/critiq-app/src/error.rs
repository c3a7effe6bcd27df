use std::collections::BTreeMap;

use axum::{Json, response::IntoResponse};
use axum_extra::extract::WithRejection;
use axum_valid::{Garde, ValidationRejection};
use http::StatusCode;
use serde_json::json;
use tracing::error;

pub type ApiResult<T, E = ApiError> = std::result::Result<T, E>;

/// Validated payload extractor whose failures come back as 400 with a
/// per-field body, the shape clients get for any other invalid input.
pub type Checked<T> = WithRejection<Garde<T>, PayloadRejection>;

pub struct PayloadRejection(axum::response::Response);

impl<E: IntoResponse> From<ValidationRejection<garde::Report, E>> for PayloadRejection {
    fn from(value: ValidationRejection<garde::Report, E>) -> Self {
        match value {
            ValidationRejection::Valid(report) => {
                let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
                for (path, error) in report.iter() {
                    fields
                        .entry(path.to_string())
                        .or_default()
                        .push(error.to_string());
                }
                PayloadRejection((StatusCode::BAD_REQUEST, Json(json!(fields))).into_response())
            }
            ValidationRejection::Inner(rejection) => {
                let mut response = rejection.into_response();
                *response.status_mut() = StatusCode::BAD_REQUEST;
                PayloadRejection(response)
            }
        }
    }
}

impl IntoResponse for PayloadRejection {
    fn into_response(self) -> axum::response::Response {
        self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed on {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Authentication required")]
    Unauthorized,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

impl From<critiq_dal::Error> for ApiError {
    fn from(value: critiq_dal::Error) -> Self {
        use critiq_dal::Error::*;
        match value {
            RecordNotFound(what) => ApiError::NotFound(what),
            Conflict(msg) => ApiError::Conflict(msg),
            DuplicateReview { .. } => ApiError::Validation {
                field: "non_field_errors",
                message: "review for this title by this author already exists".to_string(),
            },
            AlreadyTaken { field } => ApiError::Validation {
                field,
                message: "already taken".to_string(),
            },
            InvalidOrderByField(field) => ApiError::InvalidQuery(field),
            DatabaseError(e) => ApiError::Internal(e.into()),
        }
    }
}

impl From<critiq_auth::Error> for ApiError {
    fn from(value: critiq_auth::Error) -> Self {
        ApiError::Internal(value.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ApiError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                json!({ field: [message] }),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({"detail": "Authentication credentials were not provided or are invalid."}),
            ),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                json!({"detail": "You do not have permission to perform this action."}),
            ),
            ApiError::NotFound(what) => {
                (StatusCode::NOT_FOUND, json!({"detail": format!("{what} not found.")}))
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, json!({"detail": msg})),
            ApiError::InvalidQuery(msg) => (StatusCode::BAD_REQUEST, json!({"detail": msg})),
            ApiError::Internal(e) => {
                error!("Internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"detail": "Internal server error."}),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
