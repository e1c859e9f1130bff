//! HMAC-SHA256 signatures for payment-completion callbacks and webhook deliveries.
//!
//! Both modes produce a lower-case hex digest and compare it against the
//! presented signature in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result, msg};

type HmacSha256 = Hmac<Sha256>;

/// A non-empty shared secret. Construction is the only place an empty secret
/// can be caught, so it surfaces as a configuration error.
#[derive(Clone)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(secret: impl Into<String>) -> Result<Self> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(AppError::Configuration(msg::EMPTY_SECRET.into()));
        }
        Ok(Self(secret.into_bytes()))
    }

    pub fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// Canonical callback message: `order_id|payment_id`.
pub fn callback_message(order_id: &str, payment_id: &str) -> String {
    format!("{}|{}", order_id, payment_id)
}

/// Hex-encoded HMAC-SHA256 of `message` under `secret`.
pub fn sign(secret: &SigningSecret, message: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.expose())
        .map_err(|_| AppError::Configuration(msg::EMPTY_SECRET.into()))?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check `presented` against the signature of `message`. Never errors;
/// malformed or empty signatures simply fail.
pub fn verify(secret: &SigningSecret, message: &[u8], presented: &str) -> bool {
    let Ok(expected) = sign(secret, message) else {
        return false;
    };
    let expected_bytes = expected.as_bytes();
    let provided_bytes = presented.as_bytes();

    // Length is not secret: SHA-256 hex digests are always 64 chars
    if expected_bytes.len() != provided_bytes.len() {
        return false;
    }

    expected_bytes.ct_eq(provided_bytes).into()
}

/// The pair of secrets used by the verification paths.
#[derive(Debug, Clone)]
pub struct SignatureKeys {
    key_secret: SigningSecret,
    webhook_secret: SigningSecret,
}

impl SignatureKeys {
    pub fn new(key_secret: SigningSecret, webhook_secret: SigningSecret) -> Self {
        Self {
            key_secret,
            webhook_secret,
        }
    }

    pub fn verify_callback(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let message = callback_message(order_id, payment_id);
        verify(&self.key_secret, message.as_bytes(), signature)
    }

    pub fn verify_webhook(&self, raw_body: &[u8], signature: &str) -> bool {
        verify(&self.webhook_secret, raw_body, signature)
    }
}
