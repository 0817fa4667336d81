use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use relay_core::error::AppError;
use serde::Serialize;
use tracing::Instrument;

use crate::services::{broadcast, record_weather_fetch, DispatchFailure};
use crate::startup::AppState;

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub status: &'static str,
    pub sent: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<DispatchFailure>,
}

/// Broadcast the current weather to every registered follower.
#[tracing::instrument(skip(state))]
pub async fn notify_weather(State(state): State<AppState>) -> Result<Response, AppError> {
    let report = state.weather.current().await.map_err(|e| {
        record_weather_fetch(false);
        tracing::error!(error = %e, "Weather fetch failed");
        AppError::from(e)
    })?;
    record_weather_fetch(true);

    let recipients = state.store.list_all().await?;

    let sent_at = Utc::now().with_timezone(&state.config.weather.timezone);
    let text = report.format_message(&sent_at);

    // Detached so every recipient is attempted even if the caller goes away.
    let push = state.push.clone();
    let concurrency = state.config.dispatch.concurrency;
    let outcome = tokio::spawn(
        async move { broadcast(push.as_ref(), &recipients, &text, concurrency).await }
            .in_current_span(),
    )
    .await
    .map_err(|e| AppError::InternalError(anyhow::anyhow!("Broadcast task failed: {}", e)))?;

    let (status_code, status) = if outcome.is_complete_success() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::BAD_GATEWAY, "error")
    };

    Ok((
        status_code,
        Json(NotifyResponse {
            status,
            sent: outcome.sent(),
            failed: outcome.failed(),
            failures: outcome.failures(),
        }),
    )
        .into_response())
}
