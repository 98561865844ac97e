//! API error type and its HTTP rendering.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use folio_core::error::FolioError;
use serde_json::json;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Folio(#[from] FolioError),

    /// Missing, malformed or expired bearer token.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Folio(err) => match err {
                FolioError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
                }
                FolioError::Forbidden { .. } => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", err.to_string())
                }
                FolioError::UpstreamUnavailable { .. } => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "UPSTREAM_UNAVAILABLE",
                    err.to_string(),
                ),
                FolioError::InvariantViolation(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INVARIANT_VIOLATION",
                    err.to_string(),
                ),
                FolioError::Validation { .. } => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string())
                }
                FolioError::Superseded => (StatusCode::CONFLICT, "SUPERSEDED", err.to_string()),
                FolioError::Database(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "DATABASE_ERROR",
                    "Database operation failed".to_string(),
                ),
                FolioError::Internal(msg) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    msg.clone(),
                ),
            },
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "AUTH_ERROR", msg.clone()),
            ApiError::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                msg.clone(),
            ),
            ApiError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "Database operation failed".to_string(),
            ),
            ApiError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                "IO operation failed".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        tracing::error!(error = %self, code = code, status = status.as_u16(), "Request error");

        let body = Json(json!({
            "code": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: FolioError) -> (StatusCode, &'static str) {
        let (status, code, _) = ApiError::from(err).parts();
        (status, code)
    }

    #[test]
    fn engine_errors_map_to_statuses() {
        assert_eq!(
            status_of(FolioError::not_found("resource", "x")),
            (StatusCode::NOT_FOUND, "NOT_FOUND")
        );
        assert_eq!(
            status_of(FolioError::forbidden("no")),
            (StatusCode::FORBIDDEN, "FORBIDDEN")
        );
        assert_eq!(
            status_of(FolioError::upstream("directory")),
            (StatusCode::SERVICE_UNAVAILABLE, "UPSTREAM_UNAVAILABLE")
        );
        assert_eq!(
            status_of(FolioError::Superseded),
            (StatusCode::CONFLICT, "SUPERSEDED")
        );
        assert_eq!(
            status_of(FolioError::Validation {
                message: "bad".into()
            }),
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
        );
        assert_eq!(
            status_of(FolioError::InvariantViolation("cycle".into())).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn database_details_are_not_echoed() {
        let (_, _, message) = ApiError::from(FolioError::Database("secret dsn".into())).parts();
        assert_eq!(message, "Database operation failed");
    }

    #[test]
    fn unauthorized_is_401() {
        let response = ApiError::Unauthorized("missing bearer token".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
