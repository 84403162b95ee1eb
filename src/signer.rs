use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{ClientError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Produces the token sent in the `connect` command.
pub trait CredentialSigner: Send + Sync + 'static {
    fn sign(&self, user: &str, timestamp: &str, info: &str) -> Result<String>;
}

/// Centrifugo client token: hex-encoded HMAC-SHA256 over
/// `user ++ timestamp ++ info`, keyed with the project secret.
#[derive(Clone)]
pub struct HmacSigner {
    secret: String,
}

impl HmacSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner").finish_non_exhaustive()
    }
}

impl CredentialSigner for HmacSigner {
    fn sign(&self, user: &str, timestamp: &str, info: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| ClientError::Credential(e.to_string()))?;
        mac.update(user.as_bytes());
        mac.update(timestamp.as_bytes());
        mac.update(info.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl<F> CredentialSigner for F
where
    F: Fn(&str, &str, &str) -> String + Send + Sync + 'static,
{
    fn sign(&self, user: &str, timestamp: &str, info: &str) -> Result<String> {
        Ok(self(user, timestamp, info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_hex_sha256() {
        let token = HmacSigner::new("secret")
            .sign("some_id", "1522070496648", "")
            .unwrap();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn token_covers_every_input() {
        let signer = HmacSigner::new("secret");
        let base = signer.sign("u", "1", "").unwrap();
        assert_eq!(base, signer.sign("u", "1", "").unwrap());
        assert_ne!(base, signer.sign("u", "2", "").unwrap());
        assert_ne!(base, signer.sign("v", "1", "").unwrap());
        assert_ne!(base, signer.sign("u", "1", "x").unwrap());
        assert_ne!(base, HmacSigner::new("other").sign("u", "1", "").unwrap());
    }

    #[test]
    fn known_vector() {
        // HMAC-SHA256("key", "The quick brown fox jumps over the lazy dog")
        let token = HmacSigner::new("key")
            .sign("The quick brown fox ", "jumps over ", "the lazy dog")
            .unwrap();
        assert_eq!(
            token,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn closures_sign() {
        let signer = |user: &str, ts: &str, _info: &str| format!("{}-{}", user, ts);
        assert_eq!(signer.sign("a", "1", "").unwrap(), "a-1");
    }
}
