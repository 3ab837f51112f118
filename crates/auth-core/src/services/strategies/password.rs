//! Password strategy. Accepts email + password; the four distinct failure
//! causes (missing email, missing password, unknown user, wrong password,
//! inactive user) are folded into a single `ErrInvalidCredentials` so the
//! client sees byte-identical messages across all of them — no user
//! enumeration (spec §4.4.1).

use std::sync::Arc;

use async_trait::async_trait;
use auth_cache::Cache;
use auth_crypto::PasswordHasher;

use crate::error::AuthError;
use crate::models::user::User;
use crate::repositories::role_repo::RoleRepo;
use crate::repositories::user_repo::UserRepo;
use crate::services::strategies::{AuthRequest, AuthResult, AuthStrategy, CallbackRequest, StrategyKind};
use crate::services::token_service::TokenEngine;

pub struct PasswordStrategy<U: UserRepo, R: RoleRepo, C: Cache> {
    users: Arc<U>,
    roles: Arc<R>,
    hasher: PasswordHasher,
    tokens: Arc<TokenEngine<C>>,
}

impl<U: UserRepo, R: RoleRepo, C: Cache> PasswordStrategy<U, R, C> {
    pub fn new(users: Arc<U>, roles: Arc<R>, hasher: PasswordHasher, tokens: Arc<TokenEngine<C>>) -> Self {
        Self {
            users,
            roles,
            hasher,
            tokens,
        }
    }

    /// Looks up the user and verifies the password with a constant-time
    /// compare, folding every distinct failure into the same error so
    /// callers cannot distinguish "no such user" from "wrong password".
    /// Repository reads never populate `User.roles` (spec §4.5 persists
    /// roles as a separate assignment table), so the current role set is
    /// fetched here and stamped onto the returned user.
    pub async fn verify(&self, email: &str, password: &str) -> Result<User, AuthError> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let mut user = self
            .users
            .get_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let matches = self
            .hasher
            .verify_password(password, &user.password_hash)
            .unwrap_or(false);
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        if !user.can_authenticate() {
            return Err(AuthError::InvalidCredentials);
        }

        user.roles = self.roles.get_user_roles(user.id).await?;
        Ok(user)
    }
}

#[async_trait]
impl<U: UserRepo, R: RoleRepo, C: Cache> AuthStrategy for PasswordStrategy<U, R, C> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Password
    }

    fn validate_config(&self) -> Result<(), AuthError> {
        Ok(())
    }

    async fn authenticate(&self, request: AuthRequest) -> Result<AuthResult, AuthError> {
        let email = request.email.unwrap_or_default();
        let password = request.password.unwrap_or_default();
        let user = self.verify(&email, &password).await?;
        let tokens = self.tokens.mint_pair(user.id, &user.email, &user.roles)?;
        Ok(AuthResult::Complete { user, tokens })
    }

    async fn handle_callback(&self, _request: CallbackRequest) -> Result<AuthResult, AuthError> {
        Err(AuthError::InvalidInput {
            message: "password strategy does not support callbacks".to_string(),
        })
    }
}
