use crate::error::AppError;
use reqwest::Client;
use std::time::Duration;

/// HTTP client for calls leaving the relay. Every request is bounded by
/// `timeout`, connection setup included.
pub fn outbound_client(timeout: Duration) -> Result<Client, AppError> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(concat!("notify-relay/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Failed to build HTTP client: {}", e)))
}
