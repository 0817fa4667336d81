//! notify-relay: relays sensor and weather notifications to LINE followers.

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
