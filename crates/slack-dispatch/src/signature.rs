//! Shared-secret checks for inbound requests.
//!
//! Two independent mechanisms: the legacy verification token embedded in
//! every payload, and the optional `x-slack-signature` HMAC over the raw
//! body. Both comparisons run in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::DispatchError;
use crate::types::RequestSignature;

type HmacSha256 = Hmac<Sha256>;

/// Requests older than this are treated as replays.
const MAX_TIMESTAMP_AGE_SECS: u64 = 300;

/// Compare a payload token against the configured verification token.
///
/// An empty `expected` token never matches.
pub fn tokens_match(expected: &str, provided: &str) -> bool {
    let expected = expected.as_bytes();
    let provided = provided.as_bytes();
    !expected.is_empty()
        && expected.len() == provided.len()
        && expected.ct_eq(provided).unwrap_u8() == 1
}

/// Verify the signing headers of a request against the raw body.
pub fn verify_request(
    signing_secret: &str,
    headers: &RequestSignature,
    body: &[u8],
) -> Result<(), DispatchError> {
    let timestamp = headers
        .timestamp
        .as_deref()
        .ok_or_else(|| DispatchError::SignatureInvalid("missing timestamp".to_string()))?;
    let signature = headers
        .signature
        .as_deref()
        .ok_or_else(|| DispatchError::SignatureInvalid("missing signature".to_string()))?;
    verify_slack_signature(signing_secret, timestamp, body, signature)
}

/// Check `signature` against `v0=` + HMAC-SHA256(secret, `v0:{timestamp}:{body}`).
pub fn verify_slack_signature(
    signing_secret: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
) -> Result<(), DispatchError> {
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| DispatchError::SignatureInvalid("invalid timestamp".to_string()))?;
    let now = chrono::Utc::now().timestamp();
    if now.abs_diff(ts) > MAX_TIMESTAMP_AGE_SECS {
        return Err(DispatchError::SignatureInvalid(
            "request timestamp too old".to_string(),
        ));
    }

    let computed = compute_signature(signing_secret, timestamp, body)?;
    if !tokens_match(&computed, signature) {
        return Err(DispatchError::SignatureInvalid(
            "signature mismatch".to_string(),
        ));
    }

    Ok(())
}

/// Produce the `v0=...` header value for a body.
pub fn compute_signature(
    signing_secret: &str,
    timestamp: &str,
    body: &[u8],
) -> Result<String, DispatchError> {
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .map_err(|e| DispatchError::Internal(format!("HMAC init failed: {}", e)))?;
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    Ok(format!("v0={}", hex::encode(mac.finalize().into_bytes())))
}
