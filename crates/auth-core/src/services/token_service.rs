//! Mints and validates bearer access/refresh tokens, consulting the
//! Blacklist on every access-token validation with no exceptions (spec §9's
//! third open question resolved: "the spec mandates the check everywhere").

use std::sync::Arc;
use std::time::Duration;

use auth_cache::Cache;
use auth_crypto::{hash_token, JwtService};
use chrono::Utc;
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::token::{TokenClaims, TokenKind, TokenPair};
use crate::services::blacklist::Blacklist;

#[derive(Debug, Clone)]
pub struct TokenEngineConfig {
    pub access_lifetime: Duration,
    pub refresh_lifetime: Duration,
    /// Resolves spec §9's refresh-rotation open question: revoke the old
    /// refresh token on successful rotation. Default on.
    pub revoke_refresh_on_rotation: bool,
}

impl Default for TokenEngineConfig {
    fn default() -> Self {
        Self {
            access_lifetime: Duration::from_secs(900),
            refresh_lifetime: Duration::from_secs(604_800),
            revoke_refresh_on_rotation: true,
        }
    }
}

pub struct TokenEngine<C: Cache> {
    jwt: JwtService,
    blacklist: Arc<Blacklist<C>>,
    config: TokenEngineConfig,
}

impl<C: Cache> TokenEngine<C> {
    pub fn new(jwt: JwtService, blacklist: Arc<Blacklist<C>>, config: TokenEngineConfig) -> Self {
        Self { jwt, blacklist, config }
    }

    fn claims(&self, user_id: Uuid, email: &str, roles: &[String], kind: TokenKind) -> TokenClaims {
        let now = Utc::now();
        let lifetime = match kind {
            TokenKind::Access => self.config.access_lifetime,
            TokenKind::Refresh => self.config.refresh_lifetime,
        };
        TokenClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            roles: roles.to_vec(),
            iat: now.timestamp(),
            exp: (now + chrono::Duration::from_std(lifetime).unwrap_or_default()).timestamp(),
            kind,
            jti: Uuid::new_v4().to_string(),
        }
    }

    pub fn mint_access(
        &self,
        user_id: Uuid,
        email: &str,
        roles: &[String],
    ) -> Result<(String, u64), AuthError> {
        let claims = self.claims(user_id, email, roles, TokenKind::Access);
        let token = self.jwt.encode(&claims).map_err(|_| AuthError::Internal)?;
        Ok((token, self.config.access_lifetime.as_secs()))
    }

    pub fn mint_refresh(&self, user_id: Uuid, email: &str, roles: &[String]) -> Result<String, AuthError> {
        let claims = self.claims(user_id, email, roles, TokenKind::Refresh);
        self.jwt.encode(&claims).map_err(|_| AuthError::Internal)
    }

    pub fn mint_pair(&self, user_id: Uuid, email: &str, roles: &[String]) -> Result<TokenPair, AuthError> {
        let (access_token, expires_in) = self.mint_access(user_id, email, roles)?;
        let refresh_token = self.mint_refresh(user_id, email, roles)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in,
        })
    }

    /// Decodes and checks kind/expiry/signature only — does not consult the
    /// Blacklist. Used internally and by `refresh` for the refresh side,
    /// where revocation is about the *old* token, not presence in it.
    fn decode(&self, token: &str, expected_kind: TokenKind) -> Result<TokenClaims, AuthError> {
        let claims: TokenClaims = self
            .jwt
            .decode(token)
            .map_err(|e| match e {
                auth_crypto::JwtError::Expired => AuthError::Expired,
                _ => AuthError::InvalidInput {
                    message: "invalid token".to_string(),
                },
            })?;
        if claims.kind != expected_kind {
            return Err(AuthError::InvalidInput {
                message: "invalid token".to_string(),
            });
        }
        Ok(claims)
    }

    /// Verifies signature, checks `exp > now`, checks `kind == access`, then
    /// asks the Blacklist. The one code path that validates an access token.
    pub async fn validate_access(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let claims = self.decode(token, TokenKind::Access)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidInput {
            message: "invalid token".to_string(),
        })?;
        let revoked = self
            .blacklist
            .is_revoked(&hash_token(token), user_id, claims.iat)
            .await?;
        if revoked {
            return Err(AuthError::Revoked);
        }
        Ok(claims)
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.decode(refresh_token, TokenKind::Refresh)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidInput {
            message: "invalid token".to_string(),
        })?;
        let revoked = self
            .blacklist
            .is_revoked(&hash_token(refresh_token), user_id, claims.iat)
            .await?;
        if revoked {
            return Err(AuthError::Revoked);
        }

        let pair = self.mint_pair(user_id, &claims.email, &claims.roles)?;

        if self.config.revoke_refresh_on_rotation {
            let expires_at = Utc
                .timestamp_opt(claims.exp, 0)
                .single()
                .unwrap_or_else(Utc::now);
            self.blacklist
                .revoke_token(&hash_token(refresh_token), expires_at)
                .await?;
        }

        Ok(pair)
    }

    /// Parses `token`'s claims (whichever kind) and revokes it by the same
    /// hash `validate_access`/`refresh` would look up — used by `logout`,
    /// which is best-effort and must never error outward.
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        let claims: TokenClaims = self.jwt.decode(token).map_err(|_| AuthError::InvalidInput {
            message: "invalid token".to_string(),
        })?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or_else(Utc::now);
        self.blacklist.revoke_token(&hash_token(token), expires_at).await
    }

    pub fn blacklist(&self) -> &Arc<Blacklist<C>> {
        &self.blacklist
    }
}

use chrono::TimeZone;

#[cfg(test)]
mod tests {
    use super::*;
    use auth_cache::MultiLevelCache;
    use auth_crypto::SigningKey;

    fn engine() -> TokenEngine<MultiLevelCache> {
        let jwt = JwtService::new(SigningKey::new("unit-test-signing-key".to_string()).unwrap());
        let blacklist = Arc::new(Blacklist::new(Arc::new(MultiLevelCache::in_memory())));
        TokenEngine::new(jwt, blacklist, TokenEngineConfig::default())
    }

    #[tokio::test]
    async fn mints_and_validates_access_token() {
        let engine = engine();
        let user_id = Uuid::new_v4();
        let (token, expires_in) = engine
            .mint_access(user_id, "a@b.co", &["user".to_string()])
            .unwrap();
        assert_eq!(expires_in, 900);
        let claims = engine.validate_access(&token).await.unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.roles, vec!["user".to_string()]);
    }

    #[tokio::test]
    async fn rejects_refresh_token_presented_as_access() {
        let engine = engine();
        let user_id = Uuid::new_v4();
        let refresh = engine.mint_refresh(user_id, "a@b.co", &[]).unwrap();
        let result = engine.validate_access(&refresh).await;
        assert!(matches!(result, Err(AuthError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn refresh_rotates_and_revokes_old_token() {
        let engine = engine();
        let user_id = Uuid::new_v4();
        let refresh = engine.mint_refresh(user_id, "a@b.co", &[]).unwrap();
        let pair = engine.refresh(&refresh).await.unwrap();
        assert_ne!(pair.refresh_token, refresh);

        let result = engine.refresh(&refresh).await;
        assert!(matches!(result, Err(AuthError::Revoked)));
    }

    #[tokio::test]
    async fn validate_access_fails_after_revocation() {
        let engine = engine();
        let user_id = Uuid::new_v4();
        let (token, _) = engine.mint_access(user_id, "a@b.co", &[]).unwrap();
        let claims = engine.validate_access(&token).await.unwrap();
        engine
            .blacklist
            .revoke_token(&hash_token(&token), Utc::now() + chrono::Duration::minutes(15))
            .await
            .unwrap();
        let _ = claims;
        let result = engine.validate_access(&token).await;
        assert!(matches!(result, Err(AuthError::Revoked)));
    }
}
