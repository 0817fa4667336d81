pub mod message;
pub mod recipient;
pub mod weather;
pub mod webhook;

pub use message::OutboundMessage;
pub use recipient::Recipient;
pub use weather::WeatherReport;
pub use webhook::{EventKind, EventSource, WebhookEvent, WebhookRequest};
