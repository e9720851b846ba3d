//! Svix webhook signature verification.
//!
//! Clerk delivers webhooks through Svix, which signs each request using
//! HMAC-SHA256 over `"{svix-id}.{svix-timestamp}.{body}"` with a base64 key.
//! Reference: https://docs.svix.com/receiving/verifying-payloads/how-manual

use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Prefix Svix puts in front of the base64 signing key.
const SECRET_PREFIX: &str = "whsec_";

/// Default tolerance for timestamp skew, matching the Svix libraries.
pub const DEFAULT_TOLERANCE_SECS: u64 = 5 * 60;

pub const SVIX_ID: &str = "svix-id";
pub const SVIX_TIMESTAMP: &str = "svix-timestamp";
pub const SVIX_SIGNATURE: &str = "svix-signature";

/// Reasons a webhook fails verification.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("signing secret is not valid base64")]
    InvalidSecret,
    #[error("invalid timestamp header: {0}")]
    InvalidTimestamp(String),
    #[error("message timestamp too old ({age_secs}s)")]
    TimestampTooOld { age_secs: u64 },
    #[error("message timestamp too new ({ahead_secs}s ahead)")]
    TimestampTooNew { ahead_secs: u64 },
    #[error("no matching signature found")]
    NoMatchingSignature,
    #[error("verified payload is not a valid event: {0}")]
    Payload(#[from] serde_json::Error),
}

/// The three Svix headers that accompany every delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvixHeaders {
    pub id: String,
    pub timestamp: String,
    pub signature: String,
}

impl SvixHeaders {
    /// Extract the Svix headers, returning `None` if any is missing or empty.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        Some(Self {
            id: get(SVIX_ID)?,
            timestamp: get(SVIX_TIMESTAMP)?,
            signature: get(SVIX_SIGNATURE)?,
        })
    }
}

/// A verifier bound to one signing secret.
#[derive(Clone)]
pub struct Webhook {
    key: Vec<u8>,
    tolerance_secs: u64,
}

impl Webhook {
    /// Build a verifier from a `whsec_` secret. The prefix is optional.
    pub fn new(secret: &str) -> Result<Self, VerifyError> {
        let encoded = secret.trim();
        let encoded = encoded.strip_prefix(SECRET_PREFIX).unwrap_or(encoded);
        let key = STANDARD
            .decode(encoded)
            .map_err(|_| VerifyError::InvalidSecret)?;

        if key.is_empty() {
            return Err(VerifyError::InvalidSecret);
        }

        Ok(Self {
            key,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        })
    }

    /// Override the accepted timestamp skew.
    pub fn with_tolerance(mut self, tolerance_secs: u64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verify `body` against the Svix headers and parse it as JSON.
    pub fn verify<T: DeserializeOwned>(
        &self,
        body: &str,
        headers: &SvixHeaders,
    ) -> Result<T, VerifyError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        self.verify_at(body, headers, now)
    }

    fn verify_at<T: DeserializeOwned>(
        &self,
        body: &str,
        headers: &SvixHeaders,
        now: u64,
    ) -> Result<T, VerifyError> {
        let timestamp: u64 = headers
            .timestamp
            .parse()
            .map_err(|_| VerifyError::InvalidTimestamp(headers.timestamp.clone()))?;

        let age_secs = now.saturating_sub(timestamp);
        if age_secs > self.tolerance_secs {
            return Err(VerifyError::TimestampTooOld { age_secs });
        }

        let ahead_secs = timestamp.saturating_sub(now);
        if ahead_secs > self.tolerance_secs {
            return Err(VerifyError::TimestampTooNew { ahead_secs });
        }

        let expected = self.compute(&headers.id, timestamp, body)?;

        // Header holds space separated "v1,<base64>" entries, one per active key
        let matched = headers
            .signature
            .split(' ')
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == "v1")
            .filter_map(|(_, sig)| STANDARD.decode(sig).ok())
            .any(|sig| constant_time_compare(&expected, &sig));

        if !matched {
            return Err(VerifyError::NoMatchingSignature);
        }

        Ok(serde_json::from_str(body)?)
    }

    /// Produce a `v1,<base64>` signature for the given message.
    pub fn sign(&self, msg_id: &str, timestamp: u64, body: &str) -> Result<String, VerifyError> {
        let raw = self.compute(msg_id, timestamp, body)?;
        Ok(format!("v1,{}", STANDARD.encode(raw)))
    }

    fn compute(&self, msg_id: &str, timestamp: u64, body: &str) -> Result<Vec<u8>, VerifyError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).map_err(|_| VerifyError::InvalidSecret)?;
        mac.update(format!("{}.{}.{}", msg_id, timestamp, body).as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
