//! HTTP handlers for notify-relay.

pub mod arduino;
pub mod health;
pub mod notify;
pub mod webhook;

pub use arduino::notify_from_sensor;
pub use health::{health_check, metrics_endpoint, readiness_check};
pub use notify::notify_weather;
pub use webhook::receive_webhook;
