//! HMAC signatures for access URLs.
//!
//! Signature = base64url(HMAC-SHA256(secret, "{key}\n{expires_at_unix}")). Both values travel
//! in the query string as `expires` and `signature`.

use adcopy_core::AppError;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

pub const EXPIRES_PARAM: &str = "expires";
pub const SIGNATURE_PARAM: &str = "signature";

#[derive(Clone)]
pub struct AccessUrlSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for AccessUrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessUrlSigner").finish_non_exhaustive()
    }
}

impl AccessUrlSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self, key: &str, expires_at: i64) -> Result<Hmac<Sha256>, AppError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret)
            .map_err(|e| AppError::Config(format!("Invalid signing secret: {}", e)))?;
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires_at.to_string().as_bytes());
        Ok(mac)
    }

    /// Produce the signature for `key` valid until `expires_at`.
    pub fn sign(&self, key: &str, expires_at: DateTime<Utc>) -> Result<String, AppError> {
        let tag = self.mac(key, expires_at.timestamp())?.finalize().into_bytes();
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(tag))
    }

    /// Check a signature and expiry against `now`.
    pub fn verify(
        &self,
        key: &str,
        expires_at_unix: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let tag = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AppError::AccessDenied("Invalid access signature".to_string()))?;

        self.mac(key, expires_at_unix)?
            .verify_slice(&tag)
            .map_err(|_| AppError::AccessDenied("Invalid access signature".to_string()))?;

        if now.timestamp() > expires_at_unix {
            return Err(AppError::AccessDenied(
                "Access URL has expired".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_sign_and_verify() {
        let signer = AccessUrlSigner::new(SECRET);
        let now = Utc::now();
        let expires = now + Duration::hours(1);
        let signature = signer.sign("media/1-a.png", expires).unwrap();

        signer
            .verify("media/1-a.png", expires.timestamp(), &signature, now)
            .unwrap();
    }

    #[test]
    fn test_verify_rejects_other_key() {
        let signer = AccessUrlSigner::new(SECRET);
        let now = Utc::now();
        let expires = now + Duration::hours(1);
        let signature = signer.sign("media/1-a.png", expires).unwrap();

        let err = signer
            .verify("media/2-b.png", expires.timestamp(), &signature, now)
            .unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));
    }

    #[test]
    fn test_verify_rejects_expired() {
        let signer = AccessUrlSigner::new(SECRET);
        let now = Utc::now();
        let expires = now - Duration::seconds(5);
        let signature = signer.sign("media/1-a.png", expires).unwrap();

        let err = signer
            .verify("media/1-a.png", expires.timestamp(), &signature, now)
            .unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let signer = AccessUrlSigner::new(SECRET);
        let err = signer
            .verify("media/1-a.png", 0, "%%%", Utc::now())
            .unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));
    }
}
