use super::{ProviderError, ProviderResponse, PushProvider};
use crate::models::message::LinePushRequest;
use crate::models::OutboundMessage;
use async_trait::async_trait;
use backoff::ExponentialBackoff;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

const PUSH_PATH: &str = "/v2/bot/message/push";
const REQUEST_ID_HEADER: &str = "x-line-request-id";

/// LINE Messaging API push client.
pub struct LinePushProvider {
    client: Client,
    push_url: String,
    access_token: Secret<String>,
    retry_max_elapsed: Duration,
}

#[derive(Debug, Deserialize)]
struct LineErrorResponse {
    message: String,
    #[serde(default)]
    details: Vec<LineErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct LineErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    property: Option<String>,
}

impl LineErrorResponse {
    fn describe(&self) -> String {
        let details: Vec<String> = self
            .details
            .iter()
            .filter_map(|d| match (&d.property, &d.message) {
                (Some(p), Some(m)) => Some(format!("{}: {}", p, m)),
                (None, Some(m)) => Some(m.clone()),
                _ => None,
            })
            .collect();

        if details.is_empty() {
            self.message.clone()
        } else {
            format!("{} ({})", self.message, details.join("; "))
        }
    }
}

impl LinePushProvider {
    pub fn new(
        client: Client,
        api_base_url: &str,
        access_token: Secret<String>,
        retry_max_elapsed: Duration,
    ) -> Self {
        Self {
            client,
            push_url: format!("{}{}", api_base_url.trim_end_matches('/'), PUSH_PATH),
            access_token,
            retry_max_elapsed,
        }
    }

    async fn send_once(&self, message: &OutboundMessage) -> Result<ProviderResponse, ProviderError> {
        let response = self
            .client
            .post(&self.push_url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&LinePushRequest::from(message))
            .send()
            .await
            .map_err(|e| {
                ProviderError::Connection(format!("Failed to connect to LINE push API: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<LineErrorResponse>(&body)
                .map(|e| e.describe())
                .unwrap_or(body);
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        Ok(ProviderResponse::success(request_id))
    }
}

#[async_trait]
impl PushProvider for LinePushProvider {
    async fn push(&self, message: &OutboundMessage) -> Result<ProviderResponse, ProviderError> {
        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(200),
            max_interval: Duration::from_secs(1),
            max_elapsed_time: Some(self.retry_max_elapsed),
            ..Default::default()
        };

        let result = backoff::future::retry_notify(
            backoff,
            move || async move {
                self.send_once(message).await.map_err(|e| {
                    if e.is_transient() {
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            },
            |err: ProviderError, wait: Duration| {
                tracing::warn!(
                    recipient = %message.to,
                    error = %err,
                    retry_in_ms = wait.as_millis() as u64,
                    "Transient LINE push failure, retrying"
                );
            },
        )
        .await;

        match &result {
            Ok(response) => tracing::info!(
                recipient = %message.to,
                request_id = ?response.provider_id,
                "Push message sent via LINE"
            ),
            Err(e) => tracing::error!(
                recipient = %message.to,
                error = %e,
                "LINE push failed"
            ),
        }

        result
    }
}

/// Mock push provider for testing
#[derive(Default)]
pub struct MockPushProvider {
    failing_recipients: HashSet<String>,
    latency: Duration,
    attempts: AtomicU64,
    sent: Mutex<Vec<OutboundMessage>>,
}

impl MockPushProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes to any of these recipients fail with a 400 rejection.
    pub fn failing_for<I, S>(recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            failing_recipients: recipients.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Every push sleeps this long before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn attempt_count(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl PushProvider for MockPushProvider {
    async fn push(&self, message: &OutboundMessage) -> Result<ProviderResponse, ProviderError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.failing_recipients.contains(&message.to) {
            return Err(ProviderError::Rejected {
                status: 400,
                message: format!("[MOCK] rejected recipient {}", message.to),
            });
        }

        self.sent.lock().await.push(message.clone());

        tracing::info!(
            recipient = %message.to,
            "[MOCK] Push message would be sent"
        );

        Ok(ProviderResponse::success(Some(format!("mock-push-{}", attempt))))
    }
}
