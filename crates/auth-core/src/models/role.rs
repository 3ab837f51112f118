//! Role model: name, description, and a permission set. No tenant scoping
//! beyond the organization tag carried on users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub permissions: sqlx::types::Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRoleRequest {
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

/// The fixed default set seeded at startup. Permission sets here are
/// authoritative and overwritten on every process start.
pub fn default_roles() -> Vec<CreateRoleRequest> {
    vec![
        CreateRoleRequest {
            name: "admin".to_string(),
            description: Some("Full administrative access".to_string()),
            permissions: vec!["*".to_string()],
        },
        CreateRoleRequest {
            name: "user".to_string(),
            description: Some("Standard authenticated user".to_string()),
            permissions: vec!["self:read".to_string(), "self:update".to_string()],
        },
        CreateRoleRequest {
            name: "manager".to_string(),
            description: Some("Manages users within an organization".to_string()),
            permissions: vec![
                "self:read".to_string(),
                "self:update".to_string(),
                "users:read".to_string(),
                "users:update".to_string(),
            ],
        },
    ]
}
