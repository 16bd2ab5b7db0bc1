//! HMAC-SHA256 authentication of inbound payloads.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use siggate_core::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// Verifies webhook payloads against a shared secret.
///
/// When no secret is configured and the policy does not require one,
/// verification is a no-op that always succeeds.
pub struct SignatureVerifier {
    secret: Option<String>,
    require_signature: bool,
}

impl SignatureVerifier {
    pub fn new(secret: Option<String>, require_signature: bool) -> Self {
        Self {
            secret,
            require_signature,
        }
    }

    /// Whether this verifier will demand a signature.
    pub fn requires_signature(&self) -> bool {
        self.require_signature
    }

    /// Verify the hex-encoded HMAC-SHA256 `signature` over the raw payload
    /// bytes. Comparison is constant-time.
    pub fn verify(&self, payload: &[u8], signature: Option<&str>) -> Result<(), SignatureError> {
        let secret = match &self.secret {
            Some(secret) => secret,
            None => {
                if self.require_signature {
                    return Err(SignatureError::SecretNotConfigured);
                }
                return Ok(());
            }
        };

        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(SignatureError::MissingSignature)?;

        // Non-hex input can never match; treat it as a mismatch.
        let supplied = hex::decode(signature).map_err(|_| SignatureError::InvalidSignature)?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(payload);
        mac.verify_slice(&supplied)
            .map_err(|_| SignatureError::InvalidSignature)
    }

    /// Hex-encoded HMAC-SHA256 of `payload` under `secret`. What a correctly
    /// configured alert source sends.
    pub fn sign(secret: &str, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }
}
