//! Integration tests for the refresh-token rotation path: `TokenEngine`
//! wired against an in-memory `MultiLevelCache`, exercised the same way
//! `UserService`/strategies call it.

use std::sync::Arc;
use std::time::Duration;

use auth_cache::MultiLevelCache;
use auth_core::error::AuthError;
use auth_core::services::{Blacklist, TokenEngine, TokenEngineConfig};
use auth_crypto::{JwtService, SigningKey};
use uuid::Uuid;

fn engine(config: TokenEngineConfig) -> TokenEngine<MultiLevelCache> {
    let jwt = JwtService::new(SigningKey::new("refresh-test-signing-key".to_string()).unwrap());
    let blacklist = Arc::new(Blacklist::new(Arc::new(MultiLevelCache::in_memory())));
    TokenEngine::new(jwt, blacklist, config)
}

#[tokio::test]
async fn rotation_issues_a_distinct_refresh_token() {
    let engine = engine(TokenEngineConfig::default());
    let user_id = Uuid::new_v4();
    let roles = vec!["user".to_string()];

    let initial = engine.mint_refresh(user_id, "rose@example.com", &roles).unwrap();
    let pair = engine.refresh(&initial).await.unwrap();

    assert_ne!(pair.refresh_token, initial);
    assert!(!pair.access_token.is_empty());
}

#[tokio::test]
async fn rotated_refresh_token_is_revoked_when_configured() {
    let engine = engine(TokenEngineConfig {
        revoke_refresh_on_rotation: true,
        ..TokenEngineConfig::default()
    });
    let user_id = Uuid::new_v4();
    let refresh = engine.mint_refresh(user_id, "a@b.co", &[]).unwrap();

    let _ = engine.refresh(&refresh).await.unwrap();

    let result = engine.refresh(&refresh).await;
    assert!(matches!(result, Err(AuthError::Revoked)));
}

#[tokio::test]
async fn rotated_refresh_token_stays_usable_when_rotation_revocation_disabled() {
    let engine = engine(TokenEngineConfig {
        revoke_refresh_on_rotation: false,
        ..TokenEngineConfig::default()
    });
    let user_id = Uuid::new_v4();
    let refresh = engine.mint_refresh(user_id, "a@b.co", &[]).unwrap();

    let _ = engine.refresh(&refresh).await.unwrap();

    // Rotation revocation is the default, but a deployment that opts out
    // must still accept the old refresh token as a rotation input.
    let result = engine.refresh(&refresh).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn repeated_rotation_keeps_producing_fresh_access_tokens() {
    let engine = engine(TokenEngineConfig::default());
    let user_id = Uuid::new_v4();
    let mut refresh = engine.mint_refresh(user_id, "a@b.co", &[]).unwrap();

    let mut seen_access_tokens = std::collections::HashSet::new();
    for _ in 0..5 {
        let pair = engine.refresh(&refresh).await.unwrap();
        assert!(seen_access_tokens.insert(pair.access_token.clone()));
        refresh = pair.refresh_token;
    }
}

#[tokio::test]
async fn refresh_token_cannot_be_used_where_an_access_token_is_expected() {
    let engine = engine(TokenEngineConfig::default());
    let user_id = Uuid::new_v4();
    let refresh = engine.mint_refresh(user_id, "a@b.co", &[]).unwrap();

    let result = engine.validate_access(&refresh).await;
    assert!(matches!(result, Err(AuthError::InvalidInput { .. })));
}

#[tokio::test]
async fn logout_revokes_the_access_token_immediately() {
    let engine = engine(TokenEngineConfig::default());
    let user_id = Uuid::new_v4();
    let (access, _) = engine.mint_access(user_id, "a@b.co", &["user".to_string()]).unwrap();

    engine.validate_access(&access).await.unwrap();
    engine.revoke(&access).await.unwrap();

    let result = engine.validate_access(&access).await;
    assert!(matches!(result, Err(AuthError::Revoked)));
}

#[tokio::test]
async fn access_tokens_issued_before_a_user_wide_cutoff_are_rejected() {
    // Mirrors the password-change scenario: every token issued up to now
    // must stop working even though none of them were revoked individually.
    let engine = engine(TokenEngineConfig::default());
    let user_id = Uuid::new_v4();
    let (access, _) = engine.mint_access(user_id, "a@b.co", &["user".to_string()]).unwrap();

    engine
        .blacklist()
        .revoke_user(user_id, Duration::from_secs(900))
        .await
        .unwrap();

    let result = engine.validate_access(&access).await;
    assert!(matches!(result, Err(AuthError::Revoked)));
}
