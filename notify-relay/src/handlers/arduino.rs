use axum::{body::Bytes, extract::State, http::StatusCode};
use relay_core::error::AppError;
use serde::Deserialize;
use validator::Validate;

use crate::models::OutboundMessage;
use crate::services::record_dispatch;
use crate::startup::AppState;

/// LINE rejects text messages longer than 5000 characters.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ArduinoRequest {
    #[serde(default)]
    #[validate(length(max = 5000, message = "Message exceeds 5000 characters"))]
    pub message: Option<String>,
}

impl ArduinoRequest {
    /// Sensors may post nothing at all; treat that like `{}`.
    pub fn parse(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid JSON body: {}", e)))
    }

    /// The posted text, or `default` when it is absent or blank.
    pub fn text_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(default)
    }
}

/// Relay a sensor-triggered message to the configured recipient.
#[tracing::instrument(skip(state, body))]
pub async fn notify_from_sensor(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, &'static str), AppError> {
    let request = ArduinoRequest::parse(&body)?;
    request.validate()?;

    let recipient = state.config.arduino.recipient.as_deref().ok_or_else(|| {
        AppError::ConfigError(anyhow::anyhow!("LINE_FALLBACK_RECIPIENT is not configured"))
    })?;

    let text = request.text_or(&state.config.arduino.default_message);
    let message = OutboundMessage::text(recipient, text);

    let result = state.push.push(&message).await;
    record_dispatch("arduino", result.is_ok());
    result?;

    tracing::info!(recipient = %recipient, "Sensor notification relayed");
    Ok((StatusCode::OK, "OK"))
}
