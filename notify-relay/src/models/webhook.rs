//! LINE Messaging API webhook payload.
//!
//! Only the fields the relay acts on are modelled; everything else in the
//! event objects is ignored.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct WebhookRequest {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Option<Vec<serde_json::Value>>,
}

impl WebhookRequest {
    /// Parse a raw body. An empty body is an empty batch.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        if body.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
    }

    /// Decode each event on its own; a malformed event is skipped without
    /// losing the rest of the batch.
    pub fn into_events(self) -> Vec<WebhookEvent> {
        self.events
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .filter_map(|(index, raw)| match serde_json::from_value(raw) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping malformed webhook event");
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Follow,
    Unfollow,
    Message,
    Join,
    Leave,
    Postback,
    #[default]
    #[serde(other)]
    Other,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::Follow => "follow",
            EventKind::Unfollow => "unfollow",
            EventKind::Message => "message",
            EventKind::Join => "join",
            EventKind::Leave => "leave",
            EventKind::Postback => "postback",
            EventKind::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type", default)]
    pub kind: EventKind,
    #[serde(default)]
    pub source: Option<EventSource>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl WebhookEvent {
    pub fn user_id(&self) -> Option<&str> {
        self.source
            .as_ref()
            .and_then(|s| s.user_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventSource {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
}
