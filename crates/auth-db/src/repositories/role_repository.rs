//! MySQL-backed `RoleRepo`. Permission sets for the fixed default roles are
//! authoritative and re-seeded on every `ensure_default_roles` call.

use async_trait::async_trait;
use auth_core::error::AuthError;
use auth_core::models::role::{default_roles, Role};
use auth_core::repositories::role_repo::RoleRepo;
use chrono::Utc;
use sqlx::MySqlPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct MySqlRoleRepository {
    pool: MySqlPool,
}

impl MySqlRoleRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepo for MySqlRoleRepository {
    async fn ensure_default_roles(&self) -> Result<(), AuthError> {
        let now = Utc::now();
        for role in default_roles() {
            let permissions = sqlx::types::Json(role.permissions.clone());
            sqlx::query(
                r#"
                INSERT INTO roles (id, name, description, permissions, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON DUPLICATE KEY UPDATE
                    description = VALUES(description),
                    permissions = VALUES(permissions),
                    updated_at = VALUES(updated_at)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&role.name)
            .bind(&role.description)
            .bind(permissions)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Role>, AuthError> {
        let roles = sqlx::query_as::<_, Role>(
            "SELECT id, name, description, permissions, created_at, updated_at FROM roles",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Role>, AuthError> {
        let role = sqlx::query_as::<_, Role>(
            "SELECT id, name, description, permissions, created_at, updated_at FROM roles WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn assign_by_name(&self, user_id: Uuid, role_name: &str) -> Result<(), AuthError> {
        let role = self.get_by_name(role_name).await?.ok_or(AuthError::NotFound)?;
        sqlx::query("INSERT IGNORE INTO user_roles (user_id, role_id) VALUES (?, ?)")
            .bind(user_id.to_string())
            .bind(role.id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_by_name(&self, user_id: Uuid, role_name: &str) -> Result<(), AuthError> {
        let role = self.get_by_name(role_name).await?.ok_or(AuthError::NotFound)?;
        sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role_id = ?")
            .bind(user_id.to_string())
            .bind(role.id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_user_roles(&self, user_id: Uuid) -> Result<Vec<String>, AuthError> {
        let names: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT r.name FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = ?
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        Ok(names.into_iter().map(|(name,)| name).collect())
    }

    async fn check_permission(&self, user_id: Uuid, permission: &str) -> Result<bool, AuthError> {
        let roles: Vec<Role> = sqlx::query_as(
            r#"
            SELECT r.id, r.name, r.description, r.permissions, r.created_at, r.updated_at
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = ?
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(roles
            .iter()
            .any(|role| role.permissions.0.iter().any(|p| p == "*" || p == permission)))
    }
}
