//! Request Signatures
//!
//! A token request carries `base64(HMAC-SHA256(device_key, timestamp))`.
//! The server recomputes it and compares the encoded strings in constant time.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ring::hmac;
use subtle::ConstantTimeEq;

/// Compute the signature a device sends for `timestamp`
pub fn sign_timestamp(key: &str, timestamp: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key.as_bytes());
    let tag = hmac::sign(&key, timestamp.as_bytes());
    STANDARD.encode(tag.as_ref())
}

/// Compare two byte strings without short-circuiting on the first mismatch.
///
/// Differing lengths return `false`; only the length is observable.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Signature Verifier
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureVerifier;

impl SignatureVerifier {
    /// Create a verifier
    pub fn new() -> Self {
        Self
    }

    /// Verify a request signature.
    ///
    /// `key` is `None` when the identifier is unknown; that always fails.
    pub fn verify(&self, key: Option<&str>, timestamp: &str, provided_signature: &str) -> bool {
        let Some(key) = key else {
            return false;
        };

        let expected = sign_timestamp(key, timestamp);
        constant_time_eq(provided_signature.as_bytes(), expected.as_bytes())
    }
}
