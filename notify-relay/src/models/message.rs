use serde::Serialize;

/// A single plain-text push to one LINE user. Lives for one dispatch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: String,
    pub text: String,
}

impl OutboundMessage {
    pub fn text(to: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            text: text.into(),
        }
    }
}

/// Body of `POST /v2/bot/message/push`.
#[derive(Debug, Serialize)]
pub struct LinePushRequest<'a> {
    pub to: &'a str,
    pub messages: Vec<LineMessage<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LineMessage<'a> {
    Text { text: &'a str },
}

impl<'a> From<&'a OutboundMessage> for LinePushRequest<'a> {
    fn from(message: &'a OutboundMessage) -> Self {
        Self {
            to: &message.to,
            messages: vec![LineMessage::Text {
                text: &message.text,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn push_request_has_single_text_message() {
        let message = OutboundMessage::text("U123", "hello");
        let body = serde_json::to_value(LinePushRequest::from(&message)).unwrap();
        assert_eq!(
            body,
            json!({ "to": "U123", "messages": [{ "type": "text", "text": "hello" }] })
        );
    }
}
