//! HMAC-SHA256 (HS256) token signing, generic over the caller's claims type.
//!
//! `auth-crypto` knows nothing of `TokenClaims`/`TokenKind` — those live in
//! `auth-core` (which depends on this crate, not the reverse). This keeps
//! the signing primitive reusable and the layering acyclic.

use crate::keys::SigningKey;
use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token encoding failed: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

#[derive(Clone)]
pub struct JwtService {
    key: SigningKey,
}

impl JwtService {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Sign `claims` as an HS256 JWT. Callers are expected to have already
    /// set `exp`/`iat` on the claims themselves; this only signs.
    pub fn encode<T: Serialize>(&self, claims: &T) -> Result<String, JwtError> {
        let header = Header::new(Algorithm::HS256);
        Ok(encode(&header, claims, &self.key.encoding_key())?)
    }

    /// Verify signature and expiry, returning the decoded claims. Does not
    /// know about `nbf`/`iss`/`aud` — the spec's claim set carries none.
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<T, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.required_spec_claims.clear();

        let data = decode::<T>(token, &self.key.decoding_key(), &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid,
            }
        })?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestClaims {
        sub: String,
        exp: i64,
    }

    fn service() -> JwtService {
        JwtService::new(SigningKey::new("unit-test-secret".to_string()).unwrap())
    }

    #[test]
    fn round_trips_claims() {
        let svc = service();
        let claims = TestClaims {
            sub: "user-1".to_string(),
            exp: (chrono::Utc::now() + chrono::Duration::minutes(5)).timestamp(),
        };
        let token = svc.encode(&claims).unwrap();
        let decoded: TestClaims = svc.decode(&token).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn rejects_expired_token() {
        let svc = service();
        let claims = TestClaims {
            sub: "user-1".to_string(),
            exp: (chrono::Utc::now() - chrono::Duration::minutes(5)).timestamp(),
        };
        let token = svc.encode(&claims).unwrap();
        let result: Result<TestClaims, JwtError> = svc.decode(&token);
        assert!(matches!(result, Err(JwtError::Expired)));
    }

    #[test]
    fn rejects_tampered_token() {
        let svc = service();
        let claims = TestClaims {
            sub: "user-1".to_string(),
            exp: (chrono::Utc::now() + chrono::Duration::minutes(5)).timestamp(),
        };
        let mut token = svc.encode(&claims).unwrap();
        token.push('x');
        let result: Result<TestClaims, JwtError> = svc.decode(&token);
        assert!(matches!(result, Err(JwtError::Invalid)));
    }
}
