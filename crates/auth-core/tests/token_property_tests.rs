//! Property-based tests for the Token Engine's security and lifecycle
//! invariants: round-trip fidelity, TTL bounds, signature tampering, and
//! revocation consistency, exercised against the real HS256 `TokenEngine`.

use std::sync::Arc;
use std::time::Duration;

use auth_cache::MultiLevelCache;
use auth_core::error::AuthError;
use auth_core::services::{Blacklist, TokenEngine, TokenEngineConfig};
use auth_crypto::{JwtService, SigningKey};
use proptest::prelude::*;
use uuid::Uuid;

fn engine() -> TokenEngine<MultiLevelCache> {
    let jwt = JwtService::new(SigningKey::new("property-test-signing-key".to_string()).unwrap());
    let blacklist = Arc::new(Blacklist::new(Arc::new(MultiLevelCache::in_memory())));
    TokenEngine::new(jwt, blacklist, TokenEngineConfig::default())
}

fn uuid_strategy() -> impl Strategy<Value = Uuid> {
    any::<[u8; 16]>().prop_map(Uuid::from_bytes)
}

fn email_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{3,10}@[a-z]{3,10}\\.[a-z]{2,3}").unwrap()
}

fn roles_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop::string::string_regex("[a-z_]{3,12}").unwrap(), 0..5)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// For any user id / email / role set, minting and validating an access
    /// token yields back the same subject and role list.
    #[test]
    fn access_token_round_trip_preserves_identity_and_roles(
        user_id in uuid_strategy(),
        email in email_strategy(),
        roles in roles_strategy(),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let engine = engine();
            let (token, _expires_in) = engine.mint_access(user_id, &email, &roles).unwrap();
            let claims = engine.validate_access(&token).await.unwrap();

            prop_assert_eq!(claims.sub, user_id.to_string());
            prop_assert_eq!(claims.email, email);
            prop_assert_eq!(claims.roles, roles);
            Ok(())
        }).unwrap();
    }

    /// Every minted access token's lifetime matches the configured default
    /// (900 seconds, spec §4.2) within a one-second encoding margin.
    #[test]
    fn access_token_ttl_matches_configured_lifetime(
        user_id in uuid_strategy(),
        email in email_strategy(),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let engine = engine();
            let (token, expires_in) = engine.mint_access(user_id, &email, &[]).unwrap();
            prop_assert_eq!(expires_in, 900);

            let claims = engine.validate_access(&token).await.unwrap();
            let ttl = claims.exp - claims.iat;
            prop_assert!(ttl <= 900, "ttl {} exceeded configured access lifetime", ttl);
            prop_assert!(ttl > 0);
            Ok(())
        }).unwrap();
    }

    /// A refresh token is never accepted where an access token is expected,
    /// regardless of the identity it carries.
    #[test]
    fn refresh_tokens_are_never_valid_as_access_tokens(
        user_id in uuid_strategy(),
        email in email_strategy(),
        roles in roles_strategy(),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let engine = engine();
            let refresh = engine.mint_refresh(user_id, &email, &roles).unwrap();
            let result = engine.validate_access(&refresh).await;
            prop_assert!(matches!(result, Err(AuthError::InvalidInput { .. })));
            Ok(())
        }).unwrap();
    }

    /// Refresh rotation always invalidates the token it rotated away from.
    #[test]
    fn rotation_always_invalidates_the_previous_refresh_token(
        user_id in uuid_strategy(),
        email in email_strategy(),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let engine = engine();
            let refresh1 = engine.mint_refresh(user_id, &email, &[]).unwrap();
            let pair = engine.refresh(&refresh1).await.unwrap();

            prop_assert_ne!(pair.refresh_token, refresh1.clone());
            let result = engine.refresh(&refresh1).await;
            prop_assert!(matches!(result, Err(AuthError::Revoked)));
            Ok(())
        }).unwrap();
    }
}

#[tokio::test]
async fn tampering_with_the_payload_invalidates_the_signature() {
    let engine = engine();
    let (token, _) = engine
        .mint_access(Uuid::new_v4(), "a@b.co", &["admin".to_string()])
        .unwrap();

    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3);
    let mut payload_bytes = parts[1].as_bytes().to_vec();
    payload_bytes[0] = payload_bytes[0].wrapping_add(1);
    let tampered = format!("{}.{}.{}", parts[0], String::from_utf8_lossy(&payload_bytes), parts[2]);

    let result = engine.validate_access(&tampered).await;
    assert!(result.is_err(), "tampered token must fail validation");
}

#[tokio::test]
async fn a_token_signed_with_a_different_key_is_rejected() {
    let engine_a = engine();
    let jwt_b = JwtService::new(SigningKey::new("a-completely-different-key".to_string()).unwrap());
    let blacklist_b = Arc::new(Blacklist::new(Arc::new(MultiLevelCache::in_memory())));
    let engine_b = TokenEngine::new(jwt_b, blacklist_b, TokenEngineConfig::default());

    let (token, _) = engine_b.mint_access(Uuid::new_v4(), "a@b.co", &[]).unwrap();
    let result = engine_a.validate_access(&token).await;
    assert!(matches!(result, Err(AuthError::InvalidInput { .. })));
}

#[tokio::test]
async fn revocation_is_permanent_for_the_revoked_tokens_lifetime() {
    let engine = engine();
    let (token, _) = engine.mint_access(Uuid::new_v4(), "a@b.co", &[]).unwrap();

    assert!(engine.validate_access(&token).await.is_ok());
    engine.revoke(&token).await.unwrap();

    // Checked repeatedly: a fail-secure blacklist must not flap.
    for _ in 0..3 {
        let result = engine.validate_access(&token).await;
        assert!(matches!(result, Err(AuthError::Revoked)));
    }
}
