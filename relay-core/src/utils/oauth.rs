//! OAuth 1.0 request signing (HMAC-SHA1, two-legged).
//!
//! Used for providers that authenticate every request with a signature over
//! the method, URL and parameters instead of a static bearer key. Only the
//! consumer credentials take part; the token secret is always empty.
//!
//! See: https://datatracker.ietf.org/doc/html/rfc5849#section-3.4

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rand::RngCore;
use secrecy::{ExposeSecret, Secret};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters stay as-is, everything else is escaped.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";
pub const OAUTH_VERSION: &str = "1.0";

/// Percent-encode a value for the signature base string.
pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Fresh 128-bit nonce, hex encoded.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Clone)]
pub struct OAuth1Signer {
    consumer_key: String,
    consumer_secret: Secret<String>,
}

impl std::fmt::Debug for OAuth1Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth1Signer")
            .field("consumer_key", &self.consumer_key)
            .finish_non_exhaustive()
    }
}

impl OAuth1Signer {
    pub fn new(consumer_key: impl Into<String>, consumer_secret: Secret<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret,
        }
    }

    /// The protocol parameters sent in the `Authorization` header, sorted by key.
    pub fn oauth_params(&self, nonce: &str, timestamp: i64) -> Vec<(&'static str, String)> {
        vec![
            ("oauth_consumer_key", self.consumer_key.clone()),
            ("oauth_nonce", nonce.to_string()),
            ("oauth_signature_method", SIGNATURE_METHOD.to_string()),
            ("oauth_timestamp", timestamp.to_string()),
            ("oauth_version", OAUTH_VERSION.to_string()),
        ]
    }

    /// Build `METHOD&enc(url)&enc(params)`.
    ///
    /// `url` must not carry a query string; query parameters are passed in
    /// `query` and signed together with the protocol parameters.
    pub fn signature_base_string(
        &self,
        method: &str,
        url: &str,
        query: &[(&str, &str)],
        nonce: &str,
        timestamp: i64,
    ) -> String {
        let mut params: Vec<(String, String)> = self
            .oauth_params(nonce, timestamp)
            .into_iter()
            .map(|(k, v)| (encode(k), encode(&v)))
            .chain(query.iter().map(|(k, v)| (encode(k), encode(v))))
            .collect();
        params.sort();

        let param_string = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        format!(
            "{}&{}&{}",
            method.to_ascii_uppercase(),
            encode(url),
            encode(&param_string)
        )
    }

    /// base64(HMAC-SHA1(`enc(consumer_secret)&`, base string))
    pub fn signature(
        &self,
        method: &str,
        url: &str,
        query: &[(&str, &str)],
        nonce: &str,
        timestamp: i64,
    ) -> Result<String, anyhow::Error> {
        let base_string = self.signature_base_string(method, url, query, nonce, timestamp);
        let signing_key = format!("{}&", encode(self.consumer_secret.expose_secret()));

        let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
        mac.update(base_string.as_bytes());

        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// `OAuth k="v",...` with raw values and the signature last.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        query: &[(&str, &str)],
        nonce: &str,
        timestamp: i64,
    ) -> Result<String, anyhow::Error> {
        let signature = self.signature(method, url, query, nonce, timestamp)?;

        let fields = self
            .oauth_params(nonce, timestamp)
            .into_iter()
            .chain(std::iter::once(("oauth_signature", signature)))
            .map(|(k, v)| format!("{}=\"{}\"", k, v))
            .collect::<Vec<_>>()
            .join(",");

        Ok(format!("OAuth {}", fields))
    }

    /// Sign with a fresh nonce and the current time.
    pub fn authorize(
        &self,
        method: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<String, anyhow::Error> {
        let nonce = generate_nonce();
        let timestamp = unix_now()?;
        self.authorization_header(method, url, query, &nonce, timestamp)
    }
}

fn unix_now() -> Result<i64, anyhow::Error> {
    let elapsed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| anyhow::anyhow!("System clock before Unix epoch: {}", e))?;
    Ok(elapsed.as_secs() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://weather-ydn-yql.media.yahoo.com/forecastrss";
    const NONCE: &str = "0123456789abcdef0123456789abcdef";
    const TIMESTAMP: i64 = 1_700_000_000;

    fn signer() -> OAuth1Signer {
        OAuth1Signer::new(
            "dj0yJmk9relaytest",
            Secret::new("kd94hf93k423kf44".to_string()),
        )
    }

    #[test]
    fn base_string_sorts_and_double_encodes_params() {
        let base = signer().signature_base_string("GET", URL, &[], NONCE, TIMESTAMP);
        assert_eq!(
            base,
            "GET&https%3A%2F%2Fweather-ydn-yql.media.yahoo.com%2Fforecastrss&\
             oauth_consumer_key%3Ddj0yJmk9relaytest%26\
             oauth_nonce%3D0123456789abcdef0123456789abcdef%26\
             oauth_signature_method%3DHMAC-SHA1%26\
             oauth_timestamp%3D1700000000%26\
             oauth_version%3D1.0"
        );
    }

    #[test]
    fn signature_matches_reference_value() {
        let signature = signer().signature("GET", URL, &[], NONCE, TIMESTAMP).unwrap();
        assert_eq!(signature, "DXTEvh068WzTSkpPBIih7duejRA=");
    }

    #[test]
    fn query_parameters_are_signed() {
        let query = [("location", "tokyo,jp"), ("format", "json"), ("u", "c")];
        let base = signer().signature_base_string("GET", URL, &query, NONCE, TIMESTAMP);
        assert!(base.contains("format%3Djson%26location%3Dtokyo%252Cjp%26oauth_consumer_key"));
        assert!(base.ends_with("oauth_version%3D1.0%26u%3Dc"));

        let signature = signer()
            .signature("GET", URL, &query, NONCE, TIMESTAMP)
            .unwrap();
        assert_eq!(signature, "xfhnP4f8q86s+5WW7+QU5EO0EpQ=");
    }

    #[test]
    fn authorization_header_lists_raw_values_and_signature() {
        let header = signer()
            .authorization_header("GET", URL, &[], NONCE, TIMESTAMP)
            .unwrap();
        assert_eq!(
            header,
            "OAuth oauth_consumer_key=\"dj0yJmk9relaytest\",\
             oauth_nonce=\"0123456789abcdef0123456789abcdef\",\
             oauth_signature_method=\"HMAC-SHA1\",\
             oauth_timestamp=\"1700000000\",\
             oauth_version=\"1.0\",\
             oauth_signature=\"DXTEvh068WzTSkpPBIih7duejRA=\""
        );
    }

    #[test]
    fn nonce_is_128_bits_of_hex() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), 32);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(nonce, generate_nonce());
    }

    #[test]
    fn encode_keeps_unreserved_characters() {
        assert_eq!(encode("a-b.c_d~e"), "a-b.c_d~e");
        assert_eq!(encode("a b&c=d,e/f"), "a%20b%26c%3Dd%2Ce%2Ff");
    }
}
