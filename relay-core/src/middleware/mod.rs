pub mod metrics;
pub mod signature;
pub mod tracing;

pub use self::metrics::metrics_middleware;
pub use self::signature::{LINE_SIGNATURE_HEADER, SignatureConfig, signature_validation_middleware};
pub use self::tracing::{REQUEST_ID_HEADER, request_id_middleware};
