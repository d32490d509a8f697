//! Cryptographic Utilities
//!
//! Signed values are `<value>.<base64url(HMAC-SHA256(key, value))>`.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Error when verifying a signed value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("Signed value is malformed")]
    Malformed,
    #[error("Signature does not match")]
    Mismatch,
}

/// Generate a random 32-byte key
pub fn random_key() -> [u8; 32] {
    let mut key = [0u8; 32];
    rand::rng().fill_bytes(&mut key);
    key
}

/// Compute HMAC-SHA256
pub fn hmac_sha256(key: &[u8; 32], data: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Append an HMAC signature to `value`
pub fn sign_value(key: &[u8; 32], value: &str) -> String {
    let signature = hmac_sha256(key, value.as_bytes());
    format!("{}.{}", value, URL_SAFE_NO_PAD.encode(signature))
}

/// Verify a value produced by [`sign_value`] and return the unsigned part
pub fn verify_signed_value<'a>(key: &[u8; 32], signed: &'a str) -> Result<&'a str, SignatureError> {
    let (value, signature_b64) = signed
        .rsplit_once('.')
        .ok_or(SignatureError::Malformed)?;

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| SignatureError::Malformed)?;

    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(value.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| SignatureError::Mismatch)?;

    Ok(value)
}

/// Constant-time comparison to prevent timing attacks
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
