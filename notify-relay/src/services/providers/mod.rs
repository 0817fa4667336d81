pub mod line;
pub mod weather;

use async_trait::async_trait;
use relay_core::error::AppError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{OutboundMessage, WeatherReport};

pub use line::{LinePushProvider, MockPushProvider};
pub use weather::{StaticWeatherProvider, YahooWeatherProvider};

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Weather provider error: {0}")]
    Upstream(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Push rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl ProviderError {
    /// Worth another attempt: transport failures, throttling and server errors.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Connection(_) => true,
            ProviderError::Rejected { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured(msg) => AppError::ConfigError(anyhow::anyhow!(msg)),
            ProviderError::Upstream(msg) => AppError::UpstreamError(msg),
            err @ (ProviderError::Connection(_) | ProviderError::Rejected { .. }) => {
                AppError::DispatchError(err.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Platform request id, when the provider returns one.
    pub provider_id: Option<String>,
    pub success: bool,
}

impl ProviderResponse {
    pub fn success(provider_id: Option<String>) -> Self {
        Self {
            provider_id,
            success: true,
        }
    }
}

#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn push(&self, message: &OutboundMessage) -> Result<ProviderResponse, ProviderError>;
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self) -> Result<WeatherReport, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ProviderError::Connection("reset".into()).is_transient());
        assert!(ProviderError::Rejected { status: 429, message: String::new() }.is_transient());
        assert!(ProviderError::Rejected { status: 503, message: String::new() }.is_transient());
        assert!(!ProviderError::Rejected { status: 400, message: String::new() }.is_transient());
        assert!(!ProviderError::Upstream("bad shape".into()).is_transient());
    }

    #[test]
    fn dispatch_failures_map_to_dispatch_error() {
        let err: AppError = ProviderError::Rejected {
            status: 400,
            message: "The property, 'to', in the request body is invalid".into(),
        }
        .into();
        assert!(matches!(err, AppError::DispatchError(msg) if msg.contains("400")));

        let err: AppError = ProviderError::Upstream("status 401".into()).into();
        assert!(matches!(err, AppError::UpstreamError(_)));
    }
}
