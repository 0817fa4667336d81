use axum::{body::Bytes, extract::State, http::StatusCode};
use tracing::Instrument;

use crate::models::{EventKind, OutboundMessage, WebhookEvent, WebhookRequest};
use crate::services::{record_dispatch, record_registration};
use crate::startup::AppState;

/// LINE webhook receiver.
///
/// Always acknowledges with `200 OK`; per-event failures are only logged.
#[tracing::instrument(skip(state, body), fields(body_len = body.len()))]
pub async fn receive_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let events = match WebhookRequest::parse(&body) {
        Ok(request) => request.into_events(),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed webhook body");
            return (StatusCode::OK, "OK");
        }
    };

    if events.is_empty() {
        tracing::debug!("Webhook delivered no events");
    }

    // A dropped connection must not stop the batch partway.
    let batch = tokio::spawn(
        async move {
            for event in &events {
                handle_event(&state, event).await;
            }
        }
        .in_current_span(),
    );

    if let Err(e) = batch.await {
        tracing::error!(error = %e, "Webhook batch task failed");
    }

    (StatusCode::OK, "OK")
}

async fn handle_event(state: &AppState, event: &WebhookEvent) {
    match (event.kind, event.user_id()) {
        (EventKind::Follow, Some(user_id)) => handle_follow(state, user_id).await,
        (EventKind::Follow, None) => {
            tracing::warn!("Follow event without a user id, skipping");
        }
        (kind, user_id) => {
            tracing::info!(event_type = %kind, user_id = ?user_id, "Ignoring webhook event");
        }
    }
}

async fn handle_follow(state: &AppState, user_id: &str) {
    match state.store.register(user_id).await {
        Ok(()) => {
            record_registration(true);
            tracing::info!(user_id = %user_id, "Registered follower");
        }
        Err(e) => {
            record_registration(false);
            tracing::error!(user_id = %user_id, error = %e, "Failed to register follower");
        }
    }

    // The welcome goes out even when registration failed.
    let welcome = OutboundMessage::text(user_id, state.config.line.welcome_message.as_str());
    match state.push.push(&welcome).await {
        Ok(_) => record_dispatch("webhook", true),
        Err(e) => {
            record_dispatch("webhook", false);
            tracing::error!(user_id = %user_id, error = %e, "Failed to send welcome message");
        }
    }
}
