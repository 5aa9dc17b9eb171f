//! Error handling for REST API
//!
//! Provides the `AppError` type used across all REST endpoints.

use crate::archive::ArchiveError;
use axum::{http::StatusCode, response::IntoResponse, Json};

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Unavailable(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unavailable(msg) => {
                tracing::warn!(details = %msg, "Storage unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "Storage unavailable".to_string())
            }
            AppError::Internal(msg) => {
                // Log full details server-side, return generic message to client
                tracing::error!(details = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred".to_string())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

impl From<ArchiveError> for AppError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::NotFound(name) => AppError::NotFound(format!("{} not found", name)),
            ArchiveError::InvalidName(name) => AppError::BadRequest(format!("Invalid name: {}", name)),
            ArchiveError::StorageUnavailable(msg) => AppError::Unavailable(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_error_status() {
        let cases = [
            (ArchiveError::NotFound("a.csv".into()), StatusCode::NOT_FOUND),
            (ArchiveError::InvalidName("../a".into()), StatusCode::BAD_REQUEST),
            (ArchiveError::StorageUnavailable("card".into()), StatusCode::SERVICE_UNAVAILABLE),
            (
                ArchiveError::Truncated {
                    delivered: 1,
                    declared: 2,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }
}
