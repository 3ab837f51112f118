//! Symmetric signing key handling.
//!
//! The spec calls for a single process-wide HMAC-SHA256 key, loaded once at
//! startup from `auth.signing_key` and held for the lifetime of the process.
//! There is no rotation (Non-goal); `SigningKey` is therefore immutable.

use jsonwebtoken::{DecodingKey, EncodingKey};
use secrecy::{ExposeSecret, Secret};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("signing key is empty")]
    Empty,
}

#[derive(Clone)]
pub struct SigningKey {
    secret: Secret<String>,
}

impl SigningKey {
    pub fn new(secret: String) -> Result<Self, KeyError> {
        if secret.is_empty() {
            return Err(KeyError::Empty);
        }
        Ok(Self {
            secret: Secret::new(secret),
        })
    }

    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.secret.expose_secret().as_bytes())
    }

    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.secret.expose_secret().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_secret() {
        assert!(matches!(SigningKey::new(String::new()), Err(KeyError::Empty)));
    }

    #[test]
    fn builds_keys_from_secret() {
        let key = SigningKey::new("a-test-signing-secret".to_string()).unwrap();
        let _ = key.encoding_key();
        let _ = key.decoding_key();
    }
}
