//! AES-256-GCM encryption for federated credential material at rest.
//!
//! `OAuthLink` stores provider access/refresh tokens; the spec calls them
//! "encrypted access token, encrypted refresh token" (§3). This is the
//! process-wide symmetric key that backs that encryption, separate from the
//! HMAC signing key in `keys.rs` since the two never need to rotate together.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key};
use base64::Engine;
use secrecy::{ExposeSecret, Secret};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("encryption key must decode to 32 bytes")]
    InvalidKeyLength,
    #[error("encryption failed")]
    Encrypt,
    #[error("decryption failed")]
    Decrypt,
    #[error("malformed ciphertext")]
    MalformedCiphertext,
}

/// Encrypts/decrypts provider tokens before they reach `OAuthLinkRepo`.
/// Ciphertext is `base64(nonce || tag || ciphertext)`, self-contained so the
/// repository layer never needs to know the nonce separately.
#[derive(Clone)]
pub struct TokenEncryptor {
    cipher: Aes256Gcm,
}

impl TokenEncryptor {
    /// `secret` is hashed down to 32 bytes with SHA-256 so operators can use
    /// any passphrase length for `auth.signing_key`-style config knobs.
    pub fn new(secret: &Secret<String>) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(secret.expose_secret().as_bytes());
        let key_bytes = hasher.finalize();
        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| EncryptionError::Encrypt)?;
        let mut payload = nonce.to_vec();
        payload.extend_from_slice(&ciphertext);
        Ok(base64::engine::general_purpose::STANDARD.encode(payload))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, EncryptionError> {
        let payload = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| EncryptionError::MalformedCiphertext)?;
        if payload.len() < 12 {
            return Err(EncryptionError::MalformedCiphertext);
        }
        let (nonce_bytes, ciphertext) = payload.split_at(12);
        let nonce = aes_gcm::Nonce::from_slice(nonce_bytes);
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| EncryptionError::Decrypt)?;
        String::from_utf8(plaintext).map_err(|_| EncryptionError::MalformedCiphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encryptor() -> TokenEncryptor {
        TokenEncryptor::new(&Secret::new("a-test-encryption-secret".to_string()))
    }

    #[test]
    fn round_trips_plaintext() {
        let enc = encryptor();
        let ciphertext = enc.encrypt("provider-access-token").unwrap();
        assert_ne!(ciphertext, "provider-access-token");
        assert_eq!(enc.decrypt(&ciphertext).unwrap(), "provider-access-token");
    }

    #[test]
    fn distinct_calls_produce_distinct_ciphertext() {
        let enc = encryptor();
        let a = enc.encrypt("same-input").unwrap();
        let b = enc.encrypt("same-input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_malformed_ciphertext() {
        let enc = encryptor();
        assert!(enc.decrypt("not-base64!!").is_err());
    }
}
