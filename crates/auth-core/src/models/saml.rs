//! SAMLSession: the record created after a successful SAML web-browser SSO.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SamlSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub config_key: String,
    pub idp_session_index: Option<String>,
    pub name_id: String,
    pub attributes: sqlx::types::Json<serde_json::Value>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
