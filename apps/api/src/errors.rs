use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::remote::RemoteError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Session is still initializing")]
    SessionInitializing,

    #[error("Remote service error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Export failed: {0}")]
    Export(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::SessionInitializing => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SESSION_INITIALIZING",
                "Session is still initializing".to_string(),
            ),
            AppError::Remote(RemoteError::NoSession) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            // The hosted service rejected the request itself (bad credentials,
            // policy violation); pass its status and wording through.
            AppError::Remote(RemoteError::Api {
                status, message, ..
            }) if (400..500).contains(status) => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST),
                "REMOTE_REJECTED",
                message.clone(),
            ),
            AppError::Export(msg) => {
                tracing::error!("Export failed: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EXPORT_FAILED",
                    "The export could not be generated".to_string(),
                )
            }
            AppError::Remote(e) => {
                tracing::error!("Remote service error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "REMOTE_ERROR",
                    "The data service could not complete the request".to_string(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_rejection_keeps_status() {
        let err = AppError::Remote(RemoteError::Api {
            service: "auth",
            status: 400,
            message: "Invalid login credentials".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_remote_outage_is_bad_gateway() {
        let err = AppError::Remote(RemoteError::Api {
            service: "database",
            status: 503,
            message: "unavailable".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_export_failure_is_internal() {
        let err = AppError::Export("csv writer closed".to_string());
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unauthorized_status() {
        let err = AppError::Unauthorized("sign in".to_string());
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
