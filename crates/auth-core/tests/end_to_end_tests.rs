//! The seven literal end-to-end scenarios: register/login, duplicate
//! registration, enumeration-safe wrong-password, register rate limiting,
//! the OAuth authorization-code round trip, SAML JIT + group sync, and
//! password-change session revocation. Every repository and the cache are
//! in-memory fakes so the suite needs no external services.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use auth_cache::MultiLevelCache;
use auth_core::audit::TracingAuditLogger;
use auth_core::error::AuthError;
use auth_core::repositories::group_repo::InMemoryGroupRepo;
use auth_core::repositories::oauth_link_repo::InMemoryOAuthLinkRepo;
use auth_core::repositories::role_repo::{InMemoryRoleRepo, RoleRepo as _};
use auth_core::repositories::saml_repo::InMemorySamlRepo;
use auth_core::repositories::user_repo::InMemoryUserRepo;
use auth_core::services::rate_limiter::{default_configs, RateLimiter};
use auth_core::services::strategies::oauth::{OAuthProviderClient, OAuthStrategy, ProviderTokens, ProviderUserInfo};
use auth_core::services::strategies::password::PasswordStrategy;
use auth_core::services::strategies::saml::{
    ParsedSamlResponse, SamlProviderClient, SamlProviderSpec, SamlProviderType, SamlStrategy,
};
use auth_core::services::strategies::{AuthRequest, AuthResult, CallbackRequest, StrategyKind, StrategyRegistry};
use auth_core::services::token_service::{TokenEngine, TokenEngineConfig};
use auth_core::services::{Blacklist, UserService};
use auth_core::{Clock, SystemClock};
use auth_crypto::{JwtService, PasswordHasher, SigningKey};
use chrono::{Duration as ChronoDuration, Utc};

fn hasher() -> PasswordHasher {
    // Real cost is >=10 (spec §9); tests lower it so the suite stays fast.
    PasswordHasher::with_cost(4)
}

fn tokens() -> Arc<TokenEngine<MultiLevelCache>> {
    let jwt = JwtService::new(SigningKey::new("end-to-end-test-signing-key".to_string()).unwrap());
    let blacklist = Arc::new(Blacklist::new(Arc::new(MultiLevelCache::in_memory())));
    Arc::new(TokenEngine::new(jwt, blacklist, TokenEngineConfig::default()))
}

fn rate_limiter() -> Arc<RateLimiter<MultiLevelCache>> {
    let configs = default_configs();
    Arc::new(RateLimiter::new(
        Arc::new(MultiLevelCache::in_memory()),
        configs["login"].clone(),
        configs["register"].clone(),
    ))
}

async fn password_only_harness() -> UserService<InMemoryUserRepo, InMemoryRoleRepo, MultiLevelCache> {
    let users = Arc::new(InMemoryUserRepo::default());
    let roles = Arc::new(InMemoryRoleRepo::default());
    roles.ensure_default_roles().await.unwrap();

    let tokens = tokens();
    let mut registry = StrategyRegistry::new(StrategyKind::Password);
    registry
        .register(Box::new(PasswordStrategy::new(
            users.clone(),
            roles.clone(),
            hasher(),
            tokens.clone(),
        )))
        .unwrap();

    UserService::new(
        users,
        roles,
        tokens,
        rate_limiter(),
        Arc::new(registry),
        hasher(),
        Arc::new(TracingAuditLogger),
    )
}

#[tokio::test]
async fn scenario_1_register_then_login() {
    let h = password_only_harness().await;

    let (registered, _tokens) = h
        .register("198.51.100.1", "a@b.co", "Passw0rd!", Some("A".to_string()), Some("B".to_string()), Some(String::new()))
        .await
        .unwrap();
    assert_eq!(registered.roles, vec!["user".to_string()]);

    let (user, tokens) = h.login("198.51.100.1", "a@b.co", "Passw0rd!").await.unwrap();
    assert_eq!(user.email, "a@b.co");
    assert_eq!(user.roles, vec!["user".to_string()]);

    let (claims_user_id, claims_roles) = h.validate(&tokens.access_token).await.unwrap();
    assert_eq!(claims_user_id, user.id);
    assert_eq!(claims_roles, vec!["user".to_string()]);
}

#[tokio::test]
async fn scenario_2_register_duplicate() {
    let h = password_only_harness().await;

    h
        .register("198.51.100.2", "a@b.co", "Passw0rd!", Some("A".to_string()), Some("B".to_string()), None)
        .await
        .unwrap();

    let result = h
        .register("198.51.100.2", "a@b.co", "Passw0rd!", Some("A".to_string()), Some("B".to_string()), None)
        .await;
    assert!(matches!(result, Err(AuthError::AlreadyExists { .. })));
}

#[tokio::test]
async fn scenario_3_wrong_password_is_enumeration_safe() {
    let h = password_only_harness().await;
    h
        .register("198.51.100.3", "a@b.co", "Passw0rd!", None, None, None)
        .await
        .unwrap();

    let unknown_user = h.login("198.51.100.3", "nobody@x.co", "x").await.unwrap_err();
    let wrong_password = h.login("198.51.100.3", "a@b.co", "bad").await.unwrap_err();

    assert!(matches!(unknown_user, AuthError::InvalidCredentials));
    assert!(matches!(wrong_password, AuthError::InvalidCredentials));
    assert_eq!(format!("{unknown_user}"), format!("{wrong_password}"));
}

#[tokio::test]
async fn scenario_4_register_rate_limit() {
    let h = password_only_harness().await;
    let ip = "198.51.100.7";

    for n in 0..3 {
        let email = format!("user{n}@x.co");
        h
            .register(ip, &email, "Passw0rd!", None, None, None)
            .await
            .unwrap_or_else(|e| panic!("registration {n} should succeed, got {e:?}"));
    }

    let fourth = h.register(ip, "user3@x.co", "Passw0rd!", None, None, None).await;
    match fourth {
        Err(AuthError::RateLimited { retry_after_secs }) => {
            assert!(retry_after_secs > 0 && retry_after_secs <= 3600);
        }
        other => panic!("expected ErrRateLimited, got {other:?}"),
    }
}

// --- OAuth happy path -------------------------------------------------

struct StubOAuthProvider;

#[async_trait]
impl OAuthProviderClient for StubOAuthProvider {
    fn authorize_url(&self, state: &str) -> String {
        format!("https://accounts.google.example/authorize?state={state}")
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, AuthError> {
        assert_eq!(code, "abc");
        Ok(ProviderTokens {
            access_token: "provider-access-token".to_string(),
            refresh_token: None,
            expires_at: None,
        })
    }

    async fn fetch_userinfo(&self, _access_token: &str) -> Result<ProviderUserInfo, AuthError> {
        Ok(ProviderUserInfo {
            provider_user_id: "42".to_string(),
            email: "new@x.co".to_string(),
            given_name: Some("New".to_string()),
            family_name: Some("User".to_string()),
            avatar: None,
        })
    }

    fn encrypt_token(&self, plaintext: &str) -> Result<String, AuthError> {
        Ok(format!("enc:{plaintext}"))
    }
}

#[tokio::test]
async fn scenario_5_oauth_happy_path() {
    let users = Arc::new(InMemoryUserRepo::default());
    let roles = Arc::new(InMemoryRoleRepo::default());
    roles.ensure_default_roles().await.unwrap();
    let links = Arc::new(InMemoryOAuthLinkRepo::default());
    let tokens = tokens();

    let mut providers: HashMap<String, Arc<dyn OAuthProviderClient>> = HashMap::new();
    providers.insert(
        "google".to_string(),
        Arc::new(StubOAuthProvider) as Arc<dyn OAuthProviderClient>,
    );

    let strategy = OAuthStrategy::new(
        providers,
        Arc::new(SystemClock) as Arc<dyn Clock>,
        users.clone(),
        roles.clone(),
        links.clone(),
        hasher(),
        tokens,
    );

    let redirect = strategy
        .authenticate(AuthRequest {
            provider: Some("google".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    let state = match redirect {
        AuthResult::Redirect { authorization_url, state } => {
            assert!(authorization_url.contains(&state));
            state
        }
        other => panic!("expected Redirect, got {other:?}"),
    };

    let complete = strategy
        .handle_callback(CallbackRequest {
            code: Some("abc".to_string()),
            state: Some(state.clone()),
            saml_response: None,
        })
        .await
        .unwrap();
    match complete {
        AuthResult::Complete { user, tokens } => {
            assert_eq!(user.email, "new@x.co");
            assert!(!tokens.access_token.is_empty());
        }
        other => panic!("expected Complete, got {other:?}"),
    }

    let link = links.get_by_provider("google", "42").await.unwrap();
    assert!(link.is_some());

    let replay = strategy
        .handle_callback(CallbackRequest {
            code: Some("abc".to_string()),
            state: Some(state),
            saml_response: None,
        })
        .await;
    assert!(matches!(replay, Err(AuthError::InvalidState)));
}

// --- SAML JIT + group sync ---------------------------------------------

struct StubSamlProvider {
    spec: SamlProviderSpec,
    groups: Mutex<Vec<String>>,
}

#[async_trait]
impl SamlProviderClient for StubSamlProvider {
    fn spec(&self) -> &SamlProviderSpec {
        &self.spec
    }

    fn build_authn_request(&self) -> Result<String, AuthError> {
        Ok("<AuthnRequest/>".to_string())
    }

    fn parse_response(&self, _decoded_xml: &str) -> Result<ParsedSamlResponse, AuthError> {
        let now = Utc::now();
        let mut attributes = HashMap::new();
        attributes.insert("email".to_string(), vec!["alice@corp.com".to_string()]);
        attributes.insert("groups".to_string(), self.groups.lock().unwrap().clone());

        Ok(ParsedSamlResponse {
            issuer: self.spec.entity_id.clone(),
            not_before: now - ChronoDuration::minutes(5),
            not_on_or_after: now + ChronoDuration::minutes(5),
            name_id: "alice@corp.com".to_string(),
            session_index: Some("session-1".to_string()),
            attributes,
            signature_valid: true,
        })
    }
}

#[tokio::test]
async fn scenario_6_saml_jit_and_group_sync() {
    let users = Arc::new(InMemoryUserRepo::default());
    let roles = Arc::new(InMemoryRoleRepo::default());
    roles.ensure_default_roles().await.unwrap();
    let sessions = Arc::new(InMemorySamlRepo::default());
    let groups = Arc::new(InMemoryGroupRepo::default());
    let tokens = tokens();

    let provider = Arc::new(StubSamlProvider {
        spec: SamlProviderSpec {
            name: "corp-idp".to_string(),
            provider_type: SamlProviderType::Custom,
            entity_id: "https://idp.corp.com".to_string(),
            sso_url: "https://idp.corp.com/sso".to_string(),
            group_attribute: Some("groups".to_string()),
            group_sync: true,
            jit_provisioning: true,
        },
        groups: Mutex::new(vec!["admin".to_string(), "user".to_string()]),
    });

    let strategy = SamlStrategy::new(
        vec![provider.clone() as Arc<dyn SamlProviderClient>],
        users.clone(),
        roles.clone(),
        sessions,
        groups,
        hasher(),
        tokens,
    );

    let first = strategy
        .handle_callback(CallbackRequest {
            code: None,
            state: None,
            saml_response: Some(base64_encode("<Response/>")),
        })
        .await
        .unwrap();
    let (user_id, first_roles) = match first {
        AuthResult::Complete { user, .. } => (user.id, user.roles),
        other => panic!("expected Complete, got {other:?}"),
    };
    let mut sorted = first_roles.clone();
    sorted.sort();
    assert_eq!(sorted, vec!["admin".to_string(), "user".to_string()]);

    *provider.groups.lock().unwrap() = vec!["user".to_string()];

    let second = strategy
        .handle_callback(CallbackRequest {
            code: None,
            state: None,
            saml_response: Some(base64_encode("<Response/>")),
        })
        .await
        .unwrap();
    match second {
        AuthResult::Complete { user, .. } => {
            assert_eq!(user.id, user_id);
            assert_eq!(user.roles, vec!["user".to_string()]);
        }
        other => panic!("expected Complete, got {other:?}"),
    }
}

fn base64_encode(xml: &str) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(xml)
}

// --- Password change revokes sessions ----------------------------------

#[tokio::test]
async fn scenario_7_password_change_revokes_sessions() {
    let h = password_only_harness().await;

    let (user, t1) = h
        .register("198.51.100.9", "a@b.co", "Passw0rd!", None, None, None)
        .await
        .unwrap();

    assert!(h.validate(&t1.access_token).await.is_ok());

    h.change_password(user.id, "Passw0rd!", "NewPassw0rd!").await.unwrap();

    let result = h.validate(&t1.access_token).await;
    assert!(matches!(result, Err(AuthError::Revoked)));

    // The new password now works for a fresh login.
    let (_user, t2) = h.login("198.51.100.9", "a@b.co", "NewPassw0rd!").await.unwrap();
    assert!(h.validate(&t2.access_token).await.is_ok());
}
