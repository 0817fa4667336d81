use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(anyhow::Error),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Recipient store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Dispatch error: {0}")]
    DispatchError(String),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::StoreUnavailable(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let (status, error_message, details) = match self {
            AppError::ValidationError(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Validation error".to_string(),
                Some(err.to_string()),
            ),
            AppError::BadRequest(err) => (StatusCode::BAD_REQUEST, err.to_string(), None),
            AppError::Unauthorized(err) => (StatusCode::UNAUTHORIZED, err.to_string(), None),
            AppError::PayloadTooLarge(err) => {
                (StatusCode::PAYLOAD_TOO_LARGE, err.to_string(), None)
            }
            AppError::InternalError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                Some(format!("{:#}", err)),
            ),
            AppError::StoreUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Recipient store unavailable".to_string(),
                Some(msg),
            ),
            AppError::UpstreamError(msg) => (
                StatusCode::BAD_GATEWAY,
                "Upstream error".to_string(),
                Some(msg),
            ),
            AppError::DispatchError(msg) => (
                StatusCode::BAD_GATEWAY,
                "Dispatch error".to_string(),
                Some(msg),
            ),
            AppError::ConfigError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error".to_string(),
                Some(err.to_string()),
            ),
        };

        (
            status,
            Json(ErrorResponse {
                error: error_message,
                details,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_unavailable_maps_to_503() {
        let response = AppError::StoreUnavailable("connection refused".into()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn upstream_and_dispatch_map_to_502() {
        let upstream = AppError::UpstreamError("timeout".into()).into_response();
        let dispatch = AppError::DispatchError("400".into()).into_response();
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(dispatch.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn payload_too_large_maps_to_413() {
        let response =
            AppError::PayloadTooLarge(anyhow::anyhow!("over 16 bytes")).into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn unauthorized_maps_to_401() {
        let response =
            AppError::Unauthorized(anyhow::anyhow!("Invalid signature")).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
