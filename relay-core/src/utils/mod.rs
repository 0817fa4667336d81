pub mod http;
pub mod oauth;
pub mod signature;

pub use http::outbound_client;
pub use oauth::OAuth1Signer;
pub use signature::{generate_signature, verify_signature};
