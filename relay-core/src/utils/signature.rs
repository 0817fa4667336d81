use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Generate a webhook body signature.
///
/// Format: base64(HMAC-SHA256(body, secret)), as sent by LINE in
/// `X-Line-Signature`.
pub fn generate_signature(secret: &str, body: &[u8]) -> Result<String, anyhow::Error> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Verify a webhook body signature using constant-time comparison
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> Result<bool, anyhow::Error> {
    let expected_signature = generate_signature(secret, body)?;

    let expected_bytes = expected_signature.as_bytes();
    let signature_bytes = signature.trim().as_bytes();

    if expected_bytes.len() != signature_bytes.len() {
        return Ok(false);
    }

    Ok(expected_bytes.ct_eq(signature_bytes).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "line-secret";
    const BODY: &[u8] = br#"{"destination":"Uxxx","events":[]}"#;

    #[test]
    fn test_signature_matches_reference_value() {
        let signature = generate_signature(SECRET, BODY).unwrap();
        assert_eq!(signature, "qj3inLMXi+Fl+M2gbw9WpcuDAWjSLYA6tU9SYTS/riY=");
    }

    #[test]
    fn test_signature_generation_and_verification() {
        let signature = generate_signature(SECRET, BODY).unwrap();
        assert!(verify_signature(SECRET, BODY, &signature).unwrap());
    }

    #[test]
    fn test_invalid_signature() {
        let signature = generate_signature(SECRET, BODY).unwrap();
        let invalid_signature = format!("A{}", &signature[1..]);
        assert!(!verify_signature(SECRET, BODY, &invalid_signature).unwrap());
        assert!(!verify_signature(SECRET, BODY, "short").unwrap());
    }

    #[test]
    fn test_tampered_body() {
        let signature = generate_signature(SECRET, BODY).unwrap();
        let modified_body = br#"{"destination":"Uyyy","events":[]}"#;
        assert!(!verify_signature(SECRET, modified_body, &signature).unwrap());
    }

    #[test]
    fn test_wrong_secret() {
        let signature = generate_signature("other-secret", BODY).unwrap();
        assert!(!verify_signature(SECRET, BODY, &signature).unwrap());
    }
}
