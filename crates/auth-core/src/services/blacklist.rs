//! Tracks revoked tokens without needing to store the tokens themselves.
//!
//! Two entry shapes share one cache: a single-token revocation keyed by
//! token hash, and a subject-wide cutoff keyed by user id. Fail-secure: any
//! cache error during `is_revoked` is reported up as `AuthError::Internal`,
//! which callers must treat as "revoked" (spec: a compromised token must
//! not stay valid through a storage outage).

use std::sync::Arc;
use std::time::Duration;

use auth_cache::Cache;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AuthError;

fn token_key(token_hash: &str) -> String {
    format!("blacklist:token:{token_hash}")
}

fn user_key(user_id: Uuid) -> String {
    format!("blacklist:user:{user_id}")
}

pub struct Blacklist<C: Cache> {
    cache: Arc<C>,
}

impl<C: Cache> Blacklist<C> {
    pub fn new(cache: Arc<C>) -> Self {
        Self { cache }
    }

    /// Idempotent: revoking the same hash twice just resets the TTL.
    pub async fn revoke_token(
        &self,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let remaining = (expires_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::from_secs(0));
        self.cache
            .set(&token_key(token_hash), &true, remaining.max(Duration::from_secs(1)))
            .await
            .map_err(|_| AuthError::Internal)
    }

    /// Records a cutoff timestamp for the subject: every token issued at or
    /// before `now` is considered revoked for `max_lifetime` (the longest a
    /// token for this subject could still be outstanding).
    pub async fn revoke_user(&self, user_id: Uuid, max_lifetime: Duration) -> Result<(), AuthError> {
        let cutoff = Utc::now().timestamp();
        self.cache
            .set(&user_key(user_id), &cutoff, max_lifetime.max(Duration::from_secs(1)))
            .await
            .map_err(|_| AuthError::Internal)
    }

    pub async fn is_revoked(
        &self,
        token_hash: &str,
        user_id: Uuid,
        issued_at: i64,
    ) -> Result<bool, AuthError> {
        let single: Option<bool> = self
            .cache
            .get(&token_key(token_hash))
            .await
            .map_err(|_| AuthError::Internal)?;
        if single.unwrap_or(false) {
            return Ok(true);
        }

        let cutoff: Option<i64> = self
            .cache
            .get(&user_key(user_id))
            .await
            .map_err(|_| AuthError::Internal)?;
        Ok(matches!(cutoff, Some(cutoff) if issued_at <= cutoff))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_cache::MultiLevelCache;

    fn cache() -> Arc<MultiLevelCache> {
        Arc::new(MultiLevelCache::in_memory())
    }

    #[tokio::test]
    async fn unrevoked_token_is_not_revoked() {
        let bl = Blacklist::new(cache());
        let user_id = Uuid::new_v4();
        assert!(!bl.is_revoked("somehash", user_id, Utc::now().timestamp()).await.unwrap());
    }

    #[tokio::test]
    async fn single_token_revocation_is_detected() {
        let bl = Blacklist::new(cache());
        let user_id = Uuid::new_v4();
        bl.revoke_token("somehash", Utc::now() + chrono::Duration::minutes(5))
            .await
            .unwrap();
        assert!(bl.is_revoked("somehash", user_id, Utc::now().timestamp()).await.unwrap());
    }

    #[tokio::test]
    async fn user_wide_cutoff_revokes_tokens_issued_before_it() {
        let bl = Blacklist::new(cache());
        let user_id = Uuid::new_v4();
        let before = Utc::now().timestamp() - 10;
        bl.revoke_user(user_id, Duration::from_secs(600)).await.unwrap();
        assert!(bl.is_revoked("unrelated", user_id, before).await.unwrap());
    }

    #[tokio::test]
    async fn user_wide_cutoff_does_not_revoke_tokens_issued_after_it() {
        let bl = Blacklist::new(cache());
        let user_id = Uuid::new_v4();
        bl.revoke_user(user_id, Duration::from_secs(600)).await.unwrap();
        let later = Utc::now().timestamp() + 10;
        assert!(!bl.is_revoked("unrelated", user_id, later).await.unwrap());
    }
}
