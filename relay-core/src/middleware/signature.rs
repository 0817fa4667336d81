use crate::error::AppError;
use crate::utils::signature::verify_signature;
use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use http_body_util::LengthLimitError;
use secrecy::{ExposeSecret, Secret};

pub const LINE_SIGNATURE_HEADER: &str = "x-line-signature";

/// LINE webhook batches are small; anything past this is refused unread.
pub const MAX_WEBHOOK_BODY_BYTES: usize = 1024 * 1024;

/// Webhook body signature settings.
///
/// With no secret the middleware lets every request through unchanged.
#[derive(Clone, Debug)]
pub struct SignatureConfig {
    pub secret: Option<Secret<String>>,
    pub header_name: &'static str,
    pub body_limit: usize,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            secret: None,
            header_name: LINE_SIGNATURE_HEADER,
            body_limit: MAX_WEBHOOK_BODY_BYTES,
        }
    }
}

impl SignatureConfig {
    pub fn new(secret: Option<Secret<String>>) -> Self {
        Self {
            secret,
            ..Default::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }
}

pub async fn signature_validation_middleware(
    State(config): State<SignatureConfig>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(secret) = config.secret.as_ref() else {
        return Ok(next.run(req).await);
    };

    let signature = req
        .headers()
        .get(config.header_name)
        .ok_or_else(|| {
            tracing::warn!(header = config.header_name, "Webhook signature header missing");
            AppError::Unauthorized(anyhow::anyhow!("Missing header: {}", config.header_name))
        })?
        .to_str()
        .map(|s| s.to_string())
        .map_err(|_| {
            AppError::Unauthorized(anyhow::anyhow!(
                "Invalid header format: {}",
                config.header_name
            ))
        })?;

    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, config.body_limit)
        .await
        .map_err(|e| {
            if exceeds_limit(&e) {
                tracing::warn!(limit = config.body_limit, "Webhook body over limit");
                AppError::PayloadTooLarge(anyhow::anyhow!(
                    "Body exceeds {} bytes",
                    config.body_limit
                ))
            } else {
                AppError::BadRequest(anyhow::anyhow!("Failed to read body: {}", e))
            }
        })?;

    let is_valid = verify_signature(secret.expose_secret(), &bytes, &signature)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Signature verification error: {}", e)))?;

    if !is_valid {
        tracing::warn!(path = %parts.uri.path(), "Webhook signature verification failed");
        return Err(AppError::Unauthorized(anyhow::anyhow!("Invalid signature")));
    }

    let req = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(req).await)
}

fn exceeds_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}
