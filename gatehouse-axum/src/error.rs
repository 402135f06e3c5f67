use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use gatehouse::GatehouseError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Too many login attempts, retry after {retry_after} seconds")]
    RateLimited { retry_after: i64 },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<GatehouseError> for AuthError {
    fn from(err: GatehouseError) -> Self {
        match err {
            GatehouseError::SessionError(msg) => {
                AuthError::InternalError(format!("session cookie: {msg}"))
            }
            GatehouseError::StorageError(msg) | GatehouseError::ConfigurationError(msg) => {
                AuthError::InternalError(msg)
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AuthError::RateLimited { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "Too many login attempts")
            }
            AuthError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            AuthError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AuthError::InternalError(ref msg) => {
                tracing::error!(error = %msg, "Internal error while handling request");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let mut body = json!({
            "error": error_message,
            "code": status.as_u16()
        });

        let mut response = match self {
            AuthError::RateLimited { retry_after } => {
                body["retry_after"] = json!(retry_after);
                let mut response = (status, Json(body)).into_response();
                if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            _ => (status, Json(body)).into_response(),
        };

        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        response
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_response() {
        let response = AuthError::RateLimited { retry_after: 1800 }.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1800");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AuthError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::BadRequest("missing email".into())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::InternalError("boom".into())
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_gatehouse_error() {
        let err: AuthError = GatehouseError::StorageError("down".into()).into();
        assert!(matches!(err, AuthError::InternalError(msg) if msg == "down"));
    }
}
