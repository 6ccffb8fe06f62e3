//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::core_state::CoreError;
use crate::db::DatabaseError;
use crate::entry::EntryError;

/// Error response body: `{"error": "...", "code": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    /// Missing and wrong codes are indistinguishable to the caller.
    #[error("Access denied")]
    Forbidden,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Not found for today: {0}")]
    NotFoundForToday(String),
    #[error("Query timed out")]
    UpstreamTimeout,
    #[error("Mutation timed out")]
    MutationTimeout,
    /// The database stayed locked; the statement never ran.
    #[error("Database busy")]
    StorageBusy,
    #[error("Misconfigured: {0}")]
    Misconfigured(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::NotFoundForToday(_) => StatusCode::NOT_FOUND,
            ApiError::UpstreamTimeout | ApiError::MutationTimeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::StorageBusy => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Misconfigured(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Forbidden => "ACCESS_DENIED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::NotFoundForToday(_) => "NOT_FOUND_TODAY",
            ApiError::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            ApiError::MutationTimeout => "OUTCOME_UNKNOWN",
            ApiError::StorageBusy => "STORAGE_BUSY",
            ApiError::Misconfigured(_) => "MISCONFIGURED",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(detail)
            | ApiError::NotFound(detail)
            | ApiError::NotFoundForToday(detail) => detail.clone(),
            ApiError::Forbidden => "Access denied".to_string(),
            ApiError::UpstreamTimeout => {
                "The statistics backend did not respond in time. Try again.".to_string()
            }
            ApiError::MutationTimeout => {
                "The change may or may not have been saved. Check the data before retrying."
                    .to_string()
            }
            ApiError::StorageBusy => {
                "The database is busy. Nothing was saved; try again.".to_string()
            }
            ApiError::Misconfigured(detail) => {
                tracing::error!(detail, "Malformed backend response");
                "The service is misconfigured".to_string()
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                "An internal error occurred".to_string()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message(),
            code: self.code(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::LockPoisoned => ApiError::Internal("lock poisoned".into()),
            CoreError::Database(e) => e.into(),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            // A stored value outside its enum means the data store is not
            // what this build expects.
            DatabaseError::InvalidEnum { .. } => ApiError::Misconfigured(err.to_string()),
            ref busy if busy.is_busy() => ApiError::StorageBusy,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        if crate::db::is_busy(&err) {
            return ApiError::StorageBusy;
        }
        ApiError::Internal(err.to_string())
    }
}

impl From<EntryError> for ApiError {
    fn from(err: EntryError) -> Self {
        match err {
            EntryError::Validation(msg) => ApiError::BadRequest(msg),
            EntryError::NotFound(msg) => ApiError::NotFound(msg),
            EntryError::NotFoundForToday(msg) => ApiError::NotFoundForToday(msg),
            EntryError::Database(e) => e.into(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Misconfigured(err.to_string())
    }
}
