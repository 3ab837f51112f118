//! Just-in-time user provisioning, shared by the OAuth and SAML strategies
//! (spec §4.4.4): when a federated identity has no local user yet, create
//! one with a random password nobody will ever type, the default `user`
//! role, and re-read it so the returned record carries its roles.

use std::sync::Arc;

use auth_crypto::PasswordHasher;
use base64::Engine;
use rand::RngCore;

use crate::error::AuthError;
use crate::models::user::{CreateUserRequest, User};
use crate::repositories::role_repo::RoleRepo;
use crate::repositories::user_repo::UserRepo;

const DEFAULT_ROLE: &str = "user";

pub async fn provision<U: UserRepo, R: RoleRepo>(
    users: &Arc<U>,
    roles: &Arc<R>,
    hasher: &PasswordHasher,
    email: &str,
    given_name: Option<String>,
    family_name: Option<String>,
    auth_method: &str,
) -> Result<User, AuthError> {
    let mut random_password = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut random_password);
    let random_password_str = base64::engine::general_purpose::STANDARD.encode(random_password);
    let password_hash = hasher
        .hash_password(&random_password_str)
        .map_err(|_| AuthError::Internal)?;

    let created = users
        .create(
            CreateUserRequest {
                email: email.to_string(),
                given_name,
                family_name,
                phone: None,
                organization: None,
                auth_method: auth_method.to_string(),
            },
            password_hash,
        )
        .await?;

    roles.assign_by_name(created.id, DEFAULT_ROLE).await?;

    users
        .get_by_id(created.id)
        .await?
        .ok_or(AuthError::Internal)
}
