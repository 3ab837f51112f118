//! Password hashing and token-hashing utilities.

use anyhow::Result;
use argon2::password_hash::{PasswordHasher as ArgonPasswordHasher, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordVerifier, Version};
use rand_core::OsRng;
use sha2::{Digest, Sha256};

/// Argon2id password hasher. `cost` maps to Argon2's time-cost parameter
/// (iterations); memory cost is held fixed at a value memory-hard enough for
/// production but overridable down for fast tests.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self::with_cost(10)
    }

    /// `cost` ≥ 10 is required in production (spec: "a slow, memory-hard
    /// hash with cost ≥ 10"); tests lower it to keep the suite fast.
    pub fn with_cost(cost: u32) -> Self {
        let params = Params::new(19 * 1024, cost.max(1), 1, None)
            .unwrap_or_else(|_| Params::default());
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
            .to_string();
        Ok(password_hash)
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("invalid password hash: {}", e))?;
        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA-256 hex digest, used to key single-token Blacklist entries without
/// storing the bearer token itself.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hasher = PasswordHasher::with_cost(1);
        let hash = hasher.hash_password("correct horse battery staple").unwrap();
        assert!(hasher.verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!hasher.verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn token_hash_is_deterministic() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }
}
