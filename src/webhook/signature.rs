//! Webhook Signature Verification
//!
//! Paystack signs every delivery with `HMAC-SHA512(secret_key, raw_body)` and
//! sends the lowercase hex digest in the `x-paystack-signature` header.
//! Verification recomputes the digest and compares it in constant time:
//! the cost depends on the signature length only, never on the position of
//! the first differing byte.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;

use crate::webhook::error::{WebhookError, WebhookResult};

type HmacSha512 = Hmac<Sha512>;

/// Header carrying the hex-encoded signature
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Secret key used to authenticate deliveries
///
/// Immutable once built. `Debug` output is redacted.
#[derive(Clone)]
pub struct SecretKey(String);

impl SecretKey {
    /// Wrap a secret key, rejecting empty or blank values
    pub fn new(key: impl Into<String>) -> WebhookResult<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(WebhookError::Config(
                "secret key cannot be empty".to_string(),
            ));
        }
        Ok(Self(key))
    }

    fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

/// HMAC-SHA512 verifier for inbound deliveries
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    secret: SecretKey,
}

impl SignatureVerifier {
    /// Create a verifier; fails fast on an empty or blank key
    pub fn new(secret: impl Into<String>) -> WebhookResult<Self> {
        Ok(Self::with_key(SecretKey::new(secret)?))
    }

    /// Create a verifier from an already validated key
    pub fn with_key(secret: SecretKey) -> Self {
        Self { secret }
    }

    /// Check that `signature` is the lowercase hex HMAC-SHA512 of `payload`
    ///
    /// Never panics or errors: a missing signature or any failure computing
    /// the MAC yields `false`.
    pub fn verify(&self, payload: impl AsRef<[u8]>, signature: &str) -> bool {
        if signature.is_empty() {
            tracing::debug!("Rejecting webhook without a signature");
            return false;
        }

        match self.sign(payload) {
            Some(expected) => constant_time_compare(expected.as_bytes(), signature.as_bytes()),
            None => false,
        }
    }

    /// Compute the header value a genuine delivery of `payload` would carry
    pub fn sign(&self, payload: impl AsRef<[u8]>) -> Option<String> {
        let mut mac = match HmacSha512::new_from_slice(self.secret.expose()) {
            Ok(mac) => mac,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to initialise HMAC-SHA512");
                return None;
            }
        };
        mac.update(payload.as_ref());
        Some(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Length check, then a comparison that does not exit on the first mismatch
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
