//! OAuthLink: the link between a local user and a federated OAuth identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OAuthLink {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: String,
    pub provider_user_id: String,
    #[serde(skip_serializing)]
    pub access_token_encrypted: String,
    #[serde(skip_serializing)]
    pub refresh_token_encrypted: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single-use OAuth CSRF nonce. Lives only in-process inside the OAuth
/// strategy instance, never persisted.
#[derive(Debug, Clone)]
pub struct OAuthState {
    pub value: String,
    pub created_at: DateTime<Utc>,
}

impl OAuthState {
    pub fn is_expired(&self, max_age: chrono::Duration) -> bool {
        Utc::now() - self.created_at > max_age
    }
}
