//! Fan-out of one text message to many recipients.

use crate::models::OutboundMessage;
use crate::services::metrics::record_dispatch;
use crate::services::providers::{ProviderError, PushProvider};
use futures::stream::{self, StreamExt};
use serde::Serialize;

/// Outcome of a single push within a broadcast.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub recipient: String,
    pub result: Result<(), ProviderError>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DispatchFailure {
    pub recipient: String,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct BroadcastReport {
    pub outcomes: Vec<DispatchOutcome>,
}

impl BroadcastReport {
    pub fn sent(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.sent()
    }

    pub fn failures(&self) -> Vec<DispatchFailure> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.result {
                Err(e) => Some(DispatchFailure {
                    recipient: o.recipient.clone(),
                    error: e.to_string(),
                }),
                Ok(_) => None,
            })
            .collect()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Push `text` to every recipient, at most `concurrency` at a time.
///
/// Every recipient gets exactly one dispatch (with the provider's own retry
/// budget); a failure is recorded and never stops the others.
pub async fn broadcast(
    provider: &dyn PushProvider,
    recipients: &[String],
    text: &str,
    concurrency: usize,
) -> BroadcastReport {
    let outcomes = stream::iter(recipients.iter().cloned())
        .map(|recipient| async move {
            let message = OutboundMessage::text(recipient.as_str(), text);
            let result = provider.push(&message).await.map(|_| ());
            record_dispatch("broadcast", result.is_ok());
            DispatchOutcome {
                recipient,
                result,
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    let report = BroadcastReport { outcomes };
    tracing::info!(
        recipients = recipients.len(),
        sent = report.sent(),
        failed = report.failed(),
        "Broadcast finished"
    );
    report
}
