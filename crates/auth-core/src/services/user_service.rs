//! The single entry point transport handlers call through. Hosts the
//! cross-cutting policy no individual strategy should own: rate limiting,
//! password policy, and the administrative CRUD surface (spec §4.5).

use std::sync::Arc;

use auth_cache::Cache;
use auth_crypto::PasswordHasher;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::audit::{redact_email, AuditCategory, AuditEvent, AuditLogger, AuditSeverity};
use crate::error::AuthError;
use crate::models::token::TokenPair;
use crate::models::user::{
    CreateUserRequest, UpdateProfileRequest, UpdateUserRequest, User, UserListFilters, UserListPage,
};
use crate::repositories::role_repo::RoleRepo;
use crate::repositories::user_repo::UserRepo;
use crate::services::rate_limiter::RateLimiter;
use crate::services::strategies::{AuthRequest, AuthResult, CallbackRequest, StrategyKind, StrategyRegistry};
use crate::services::token_service::TokenEngine;

const MIN_PAGE_SIZE: u32 = 1;
const MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_ROLE: &str = "user";

pub struct UserService<U: UserRepo, R: RoleRepo, C: Cache> {
    users: Arc<U>,
    roles: Arc<R>,
    tokens: Arc<TokenEngine<C>>,
    rate_limiter: Arc<RateLimiter<C>>,
    strategies: Arc<StrategyRegistry>,
    hasher: PasswordHasher,
    audit: Arc<dyn AuditLogger>,
}

impl<U: UserRepo, R: RoleRepo, C: Cache> UserService<U, R, C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<U>,
        roles: Arc<R>,
        tokens: Arc<TokenEngine<C>>,
        rate_limiter: Arc<RateLimiter<C>>,
        strategies: Arc<StrategyRegistry>,
        hasher: PasswordHasher,
        audit: Arc<dyn AuditLogger>,
    ) -> Self {
        Self {
            users,
            roles,
            tokens,
            rate_limiter,
            strategies,
            hasher,
            audit,
        }
    }

    async fn log(&self, category: AuditCategory, action: &str, actor: Option<Uuid>, outcome_err: Option<&AuthError>) {
        let mut event = AuditEvent::new(category, action.to_string(), AuditSeverity::Info);
        if let Some(actor) = actor {
            event = event.with_actor(actor);
        }
        if let Some(err) = outcome_err {
            event = event.failure(err.kind_name());
        }
        self.audit.log(event).await;
    }

    pub async fn register(
        &self,
        client_ip: &str,
        email: &str,
        password: &str,
        given_name: Option<String>,
        family_name: Option<String>,
        phone: Option<String>,
    ) -> Result<(User, TokenPair), AuthError> {
        async {
            let decision = self.rate_limiter.allow_register(client_ip).await;
            if !decision.allowed {
                return Err(AuthError::RateLimited {
                    retry_after_secs: decision.retry_after.as_secs(),
                });
            }

            if !validator::validate_email(email) {
                return Err(AuthError::InvalidInput {
                    message: "invalid email".to_string(),
                });
            }
            validate_password_policy(password)?;

            if self.users.get_by_email(email).await?.is_some() {
                return Err(AuthError::AlreadyExists {
                    message: "email already registered".to_string(),
                });
            }

            let password_hash = self
                .hasher
                .hash_password(password)
                .map_err(|_| AuthError::Internal)?;

            let created = self
                .users
                .create(
                    CreateUserRequest {
                        email: email.to_string(),
                        given_name: sanitize_name(given_name),
                        family_name: sanitize_name(family_name),
                        phone: sanitize_name(phone),
                        organization: None,
                        auth_method: "password".to_string(),
                    },
                    password_hash,
                )
                .await?;

            self.roles.assign_by_name(created.id, DEFAULT_ROLE).await?;
            let mut user = self.users.get_by_id(created.id).await?.ok_or(AuthError::Internal)?;
            user.roles = self.roles.get_user_roles(user.id).await?;

            let tokens = self.tokens.mint_pair(user.id, &user.email, &user.roles)?;
            metrics::counter!("user_service_register_total", 1);
            info!(email = %redact_email(&user.email), "user registered");
            self.log(AuditCategory::UserManagement, "register", Some(user.id), None).await;

            Ok((user, tokens))
        }
        .instrument(info_span!("register"))
        .await
    }

    pub async fn login(
        &self,
        client_ip: &str,
        email: &str,
        password: &str,
    ) -> Result<(User, TokenPair), AuthError> {
        async {
            let decision = self.rate_limiter.allow_login(client_ip).await;
            if !decision.allowed {
                return Err(AuthError::RateLimited {
                    retry_after_secs: decision.retry_after.as_secs(),
                });
            }

            if self.strategies.active_kind() != StrategyKind::Password {
                return Err(AuthError::WrongAuthType {
                    active_kind: self.strategies.active_kind().to_string(),
                });
            }

            let strategy = self
                .strategies
                .active()
                .ok_or(AuthError::Internal)?;

            let result = strategy
                .authenticate(AuthRequest {
                    email: Some(email.to_string()),
                    password: Some(password.to_string()),
                    provider: None,
                    organization: None,
                })
                .await;

            match &result {
                Ok(AuthResult::Complete { user, .. }) => {
                    info!(email = %redact_email(&user.email), "login succeeded");
                    self.log(AuditCategory::Authentication, "login", Some(user.id), None).await;
                }
                Err(e) => {
                    info!(email = %redact_email(email), "login failed");
                    self.log(AuditCategory::Authentication, "login", None, Some(e)).await;
                }
                _ => {}
            }

            match result? {
                AuthResult::Complete { user, tokens } => Ok((user, tokens)),
                _ => Err(AuthError::Internal),
            }
        }
        .instrument(info_span!("login"))
        .await
    }

    pub async fn login_with(&self, kind: StrategyKind, request: AuthRequest) -> Result<AuthResult, AuthError> {
        let strategy = self
            .strategies
            .get(kind)
            .ok_or_else(|| AuthError::InvalidInput {
                message: format!("strategy not configured: {kind}"),
            })?;
        strategy.authenticate(request).await
    }

    pub async fn callback(&self, kind: StrategyKind, request: CallbackRequest) -> Result<AuthResult, AuthError> {
        let strategy = self
            .strategies
            .get(kind)
            .ok_or_else(|| AuthError::InvalidInput {
                message: format!("strategy not configured: {kind}"),
            })?;
        strategy.handle_callback(request).await
    }

    /// Best-effort: logout never errors outward.
    pub async fn logout(&self, token: &str) {
        if let Err(e) = self.tokens.revoke(token).await {
            tracing::debug!(error = ?e, "logout: token revoke failed, ignoring");
        }
    }

    pub async fn validate(&self, token: &str) -> Result<(Uuid, Vec<String>), AuthError> {
        let claims = self.tokens.validate_access(token).await?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidInput {
            message: "invalid token".to_string(),
        })?;
        Ok((user_id, claims.roles))
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.tokens.refresh(refresh_token).await
    }

    pub async fn change_password(&self, user_id: Uuid, old_password: &str, new_password: &str) -> Result<(), AuthError> {
        async {
            let user = self.users.get_by_id(user_id).await?.ok_or(AuthError::NotFound)?;
            let matches = self
                .hasher
                .verify_password(old_password, &user.password_hash)
                .unwrap_or(false);
            if !matches {
                return Err(AuthError::InvalidCredentials);
            }
            validate_password_policy(new_password)?;

            let new_hash = self
                .hasher
                .hash_password(new_password)
                .map_err(|_| AuthError::Internal)?;
            self.users.update_password(user_id, new_hash).await?;

            self.tokens
                .blacklist()
                .revoke_user(user_id, std::time::Duration::from_secs(604_800))
                .await?;

            info!(user_id = %user_id, "password changed, all sessions revoked");
            self.log(AuditCategory::Security, "change_password", Some(user_id), None).await;
            Ok(())
        }
        .instrument(info_span!("change_password"))
        .await
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User, AuthError> {
        self.users.get_by_id(id).await?.ok_or(AuthError::NotFound)
    }

    pub async fn update_user(&self, id: Uuid, req: UpdateUserRequest) -> Result<User, AuthError> {
        self.users.update(id, req).await
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<(), AuthError> {
        self.users.delete(id).await
    }

    pub async fn update_profile(&self, id: Uuid, req: UpdateProfileRequest) -> Result<User, AuthError> {
        self.users
            .update(
                id,
                UpdateUserRequest {
                    given_name: req.given_name,
                    family_name: req.family_name,
                    avatar: req.avatar,
                    bio: req.bio,
                    timezone: req.timezone,
                    organization: None,
                },
            )
            .await
    }

    pub async fn list_users(
        &self,
        page: u32,
        size: u32,
        filters: UserListFilters,
    ) -> Result<UserListPage, AuthError> {
        let page = page.max(1);
        let size = size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);
        let (items, total) = self.users.list(page, size, filters).await?;
        Ok(UserListPage { items, total, page, size })
    }

    pub async fn assign_role(&self, user_id: Uuid, role_name: &str) -> Result<(), AuthError> {
        self.roles.assign_by_name(user_id, role_name).await
    }

    pub async fn remove_role(&self, user_id: Uuid, role_name: &str) -> Result<(), AuthError> {
        self.roles.remove_by_name(user_id, role_name).await
    }

    pub async fn get_user_roles(&self, user_id: Uuid) -> Result<Vec<String>, AuthError> {
        self.roles.get_user_roles(user_id).await
    }

    pub async fn check_permission(&self, user_id: Uuid, permission: &str) -> Result<bool, AuthError> {
        self.roles.check_permission(user_id, permission).await
    }
}

/// Length >= 8, mixed character classes, no spaces (spec §4.5, boundary
/// tested in §8: "exactly at the policy minimum length accepted, one
/// shorter is rejected").
fn validate_password_policy(password: &str) -> Result<(), AuthError> {
    if password.len() < 8 {
        return Err(AuthError::InvalidInput {
            message: "password must be at least 8 characters".to_string(),
        });
    }
    if password.contains(' ') {
        return Err(AuthError::InvalidInput {
            message: "password must not contain spaces".to_string(),
        });
    }
    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace());
    let classes_present = [has_upper, has_lower, has_digit, has_symbol]
        .iter()
        .filter(|present| **present)
        .count();
    if classes_present < 3 {
        return Err(AuthError::InvalidInput {
            message: "password must mix at least three of: uppercase, lowercase, digit, symbol".to_string(),
        });
    }
    Ok(())
}

/// Strips control characters and caps length; applied to user-supplied
/// names before they reach storage.
fn sanitize_name(input: Option<String>) -> Option<String> {
    input.map(|s| {
        let cleaned: String = s.chars().filter(|c| !c.is_control()).collect();
        cleaned.chars().take(100).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_policy_accepts_minimum_length_mixed_classes() {
        assert!(validate_password_policy("Passw0rd").is_ok());
    }

    #[test]
    fn password_policy_rejects_one_shorter_than_minimum() {
        assert!(validate_password_policy("Passw0r").is_err());
    }

    #[test]
    fn password_policy_rejects_spaces() {
        assert!(validate_password_policy("Pass word1").is_err());
    }

    #[test]
    fn password_policy_rejects_single_character_class() {
        assert!(validate_password_policy("alllowercase").is_err());
    }

    #[test]
    fn sanitize_name_strips_control_characters() {
        assert_eq!(sanitize_name(Some("A\u{0007}B".to_string())), Some("AB".to_string()));
    }
}
