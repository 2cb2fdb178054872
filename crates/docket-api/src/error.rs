//! HTTP error type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

/// Error returned by every handler, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    Internal(docket_core::Error),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    PayloadTooLarge(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

impl From<docket_core::Error> for ApiError {
    fn from(err: docket_core::Error) -> Self {
        use docket_core::Error;

        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::CaseNotFound(_) => ApiError::NotFound("Kasus tidak ditemukan".to_string()),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            Error::Forbidden(msg) => ApiError::Forbidden(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Internal(err) => {
                error!(subsystem = "api", error = %err, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docket_core::Error;

    fn status_of(err: Error) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_core_errors_map_to_status_codes() {
        assert_eq!(status_of(Error::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(Error::CaseNotFound(42)), StatusCode::NOT_FOUND);
        assert_eq!(status_of(Error::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(Error::Unauthorized("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(Error::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status_of(Error::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_of(Error::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(Error::Storage("disk".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
