//! OAuth 2.0 authorization-code strategy. `OAuthProviderClient` is a port:
//! this module only knows the shape of a provider round-trip, never how the
//! HTTP calls are actually made — `auth-protocols` supplies the `reqwest`-
//! backed adapter per configured provider (spec §4.4.2).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auth_cache::Cache;
use auth_crypto::PasswordHasher;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::RngCore;

use crate::clock::Clock;
use crate::error::AuthError;
use crate::models::user::UpdateUserRequest;
use crate::repositories::oauth_link_repo::OAuthLinkRepo;
use crate::repositories::role_repo::RoleRepo;
use crate::repositories::user_repo::UserRepo;
use crate::services::strategies::jit;
use crate::services::strategies::{AuthRequest, AuthResult, AuthStrategy, CallbackRequest, StrategyKind};
use crate::services::token_service::TokenEngine;

const STATE_MAX_AGE: chrono::Duration = chrono::Duration::minutes(10);

#[derive(Debug, Clone)]
pub struct ProviderTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ProviderUserInfo {
    pub provider_user_id: String,
    pub email: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub avatar: Option<String>,
}

/// Port implemented by `auth-protocols` against a real IdP, or by a test
/// double in unit tests. One instance per configured provider.
#[async_trait]
pub trait OAuthProviderClient: Send + Sync {
    fn authorize_url(&self, state: &str) -> String;
    async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, AuthError>;
    async fn fetch_userinfo(&self, access_token: &str) -> Result<ProviderUserInfo, AuthError>;
    /// Encrypts the provider's access/refresh tokens for storage in
    /// `OAuthLink`. Kept on the adapter since only it knows the provider's
    /// token shape worth protecting.
    fn encrypt_token(&self, plaintext: &str) -> Result<String, AuthError>;
}

struct StateEntry {
    created_at: DateTime<Utc>,
    provider: String,
}

pub struct OAuthStrategy<U: UserRepo, R: RoleRepo, O: OAuthLinkRepo, C: Cache> {
    providers: std::collections::HashMap<String, Arc<dyn OAuthProviderClient>>,
    /// Guarded by `DashMap`'s own sharded locking; safe under concurrent
    /// callbacks per spec §5's "OAuth state reads-and-deletes must be
    /// atomic".
    states: DashMap<String, StateEntry>,
    clock: Arc<dyn Clock>,
    users: Arc<U>,
    roles: Arc<R>,
    links: Arc<O>,
    hasher: PasswordHasher,
    tokens: Arc<TokenEngine<C>>,
}

impl<U: UserRepo, R: RoleRepo, O: OAuthLinkRepo, C: Cache> OAuthStrategy<U, R, O, C> {
    pub fn new(
        providers: std::collections::HashMap<String, Arc<dyn OAuthProviderClient>>,
        clock: Arc<dyn Clock>,
        users: Arc<U>,
        roles: Arc<R>,
        links: Arc<O>,
        hasher: PasswordHasher,
        tokens: Arc<TokenEngine<C>>,
    ) -> Self {
        Self {
            providers,
            states: DashMap::new(),
            clock,
            users,
            roles,
            links,
            hasher,
            tokens,
        }
    }

    /// Cooperative background sweep evicting stale state entries; spawned
    /// by the caller at boot and aborted at shutdown (spec §5).
    pub async fn run_sweeper(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(300));
        loop {
            ticker.tick().await;
            let now = self.clock.now();
            self.states.retain(|_, entry| now - entry.created_at < STATE_MAX_AGE);
        }
    }
}

#[async_trait]
impl<U: UserRepo, R: RoleRepo, O: OAuthLinkRepo, C: Cache> AuthStrategy for OAuthStrategy<U, R, O, C> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::OAuth
    }

    fn validate_config(&self) -> Result<(), AuthError> {
        if self.providers.is_empty() {
            return Err(AuthError::InvalidInput {
                message: "no OAuth providers configured".to_string(),
            });
        }
        Ok(())
    }

    async fn authenticate(&self, request: AuthRequest) -> Result<AuthResult, AuthError> {
        let provider_name = request.provider.ok_or_else(|| AuthError::InvalidInput {
            message: "provider is required".to_string(),
        })?;
        let client = self
            .providers
            .get(&provider_name)
            .ok_or_else(|| AuthError::InvalidInput {
                message: format!("unknown OAuth provider: {provider_name}"),
            })?;

        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let state = hex_encode(&bytes);

        self.states.insert(
            state.clone(),
            StateEntry {
                created_at: self.clock.now(),
                provider: provider_name,
            },
        );

        Ok(AuthResult::Redirect {
            authorization_url: client.authorize_url(&state),
            state,
        })
    }

    async fn handle_callback(&self, request: CallbackRequest) -> Result<AuthResult, AuthError> {
        let code = request.code.filter(|c| !c.is_empty()).ok_or(AuthError::InvalidState)?;
        let state_key = request.state.filter(|s| !s.is_empty()).ok_or(AuthError::InvalidState)?;

        // Atomic read-and-delete: the `DashMap::remove` call both answers
        // "does this state exist" and consumes it in one shard lock.
        let entry = self.states.remove(&state_key).map(|(_, v)| v).ok_or(AuthError::InvalidState)?;
        if self.clock.now() - entry.created_at > STATE_MAX_AGE {
            return Err(AuthError::InvalidState);
        }

        let client = self
            .providers
            .get(&entry.provider)
            .ok_or_else(|| AuthError::Federation {
                provider: entry.provider.clone(),
            })?;

        let provider_tokens = client
            .exchange_code(&code)
            .await
            .map_err(|_| AuthError::Federation {
                provider: entry.provider.clone(),
            })?;
        let profile = client
            .fetch_userinfo(&provider_tokens.access_token)
            .await
            .map_err(|_| AuthError::Federation {
                provider: entry.provider.clone(),
            })?;

        let existing_link = self
            .links
            .get_by_provider(&entry.provider, &profile.provider_user_id)
            .await?;

        let mut user = match existing_link {
            Some(link) => self.users.get_by_id(link.user_id).await?.ok_or(AuthError::NotFound)?,
            None => match self.users.get_by_email(&profile.email).await? {
                Some(user) => user,
                None => {
                    jit::provision(
                        &self.users,
                        &self.roles,
                        &self.hasher,
                        &profile.email,
                        profile.given_name.clone(),
                        profile.family_name.clone(),
                        &format!("oauth:{}", entry.provider),
                    )
                    .await?
                }
            },
        };

        let profile_changed = user.given_name != profile.given_name
            || user.family_name != profile.family_name
            || user.avatar != profile.avatar;
        if profile_changed {
            user = self
                .users
                .update(
                    user.id,
                    UpdateUserRequest {
                        given_name: profile.given_name.clone(),
                        family_name: profile.family_name.clone(),
                        avatar: profile.avatar.clone(),
                        ..Default::default()
                    },
                )
                .await?;
        }

        let access_encrypted = client.encrypt_token(&provider_tokens.access_token)?;
        let refresh_encrypted = provider_tokens
            .refresh_token
            .as_deref()
            .map(|t| client.encrypt_token(t))
            .transpose()?;
        self.links
            .upsert(
                user.id,
                &entry.provider,
                &profile.provider_user_id,
                access_encrypted,
                refresh_encrypted,
                provider_tokens.expires_at,
            )
            .await?;

        if !user.can_authenticate() {
            return Err(AuthError::UserInactive);
        }

        let tokens = self.tokens.mint_pair(user.id, &user.email, &user.roles)?;
        Ok(AuthResult::Complete { user, tokens })
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(s, "{b:02x}").unwrap();
    }
    s
}
