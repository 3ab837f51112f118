use crate::error::AuthError;
use crate::models::role::{default_roles, Role};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait RoleRepo: Send + Sync {
    /// Idempotent: seeds the fixed default role set, overwriting permission
    /// sets on every call so they stay authoritative across restarts.
    async fn ensure_default_roles(&self) -> Result<(), AuthError>;
    async fn get_all(&self) -> Result<Vec<Role>, AuthError>;
    async fn get_by_name(&self, name: &str) -> Result<Option<Role>, AuthError>;
    /// Set semantics: assigning the same (user, role) twice is a no-op.
    async fn assign_by_name(&self, user_id: Uuid, role_name: &str) -> Result<(), AuthError>;
    async fn remove_by_name(&self, user_id: Uuid, role_name: &str) -> Result<(), AuthError>;
    async fn get_user_roles(&self, user_id: Uuid) -> Result<Vec<String>, AuthError>;
    async fn check_permission(&self, user_id: Uuid, permission: &str) -> Result<bool, AuthError>;
}

/// In-memory fake for integration tests: same upsert-on-seed and set
/// semantics as `MySqlRoleRepository`.
#[derive(Default)]
pub struct InMemoryRoleRepo {
    roles: std::sync::Mutex<std::collections::HashMap<String, Role>>,
    assignments: std::sync::Mutex<std::collections::HashMap<Uuid, std::collections::HashSet<String>>>,
}

#[async_trait]
impl RoleRepo for InMemoryRoleRepo {
    async fn ensure_default_roles(&self) -> Result<(), AuthError> {
        let now = chrono::Utc::now();
        let mut roles = self.roles.lock().unwrap();
        for role in default_roles() {
            let entry = roles.entry(role.name.clone()).or_insert_with(|| Role {
                id: Uuid::new_v4(),
                name: role.name.clone(),
                description: role.description.clone(),
                permissions: sqlx::types::Json(role.permissions.clone()),
                created_at: now,
                updated_at: now,
            });
            entry.description = role.description;
            entry.permissions = sqlx::types::Json(role.permissions);
            entry.updated_at = now;
        }
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Role>, AuthError> {
        Ok(self.roles.lock().unwrap().values().cloned().collect())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Role>, AuthError> {
        Ok(self.roles.lock().unwrap().get(name).cloned())
    }

    async fn assign_by_name(&self, user_id: Uuid, role_name: &str) -> Result<(), AuthError> {
        if !self.roles.lock().unwrap().contains_key(role_name) {
            return Err(AuthError::NotFound);
        }
        self.assignments
            .lock()
            .unwrap()
            .entry(user_id)
            .or_default()
            .insert(role_name.to_string());
        Ok(())
    }

    async fn remove_by_name(&self, user_id: Uuid, role_name: &str) -> Result<(), AuthError> {
        if !self.roles.lock().unwrap().contains_key(role_name) {
            return Err(AuthError::NotFound);
        }
        if let Some(assigned) = self.assignments.lock().unwrap().get_mut(&user_id) {
            assigned.remove(role_name);
        }
        Ok(())
    }

    async fn get_user_roles(&self, user_id: Uuid) -> Result<Vec<String>, AuthError> {
        Ok(self
            .assignments
            .lock()
            .unwrap()
            .get(&user_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn check_permission(&self, user_id: Uuid, permission: &str) -> Result<bool, AuthError> {
        let assigned = self.get_user_roles(user_id).await?;
        let roles = self.roles.lock().unwrap();
        Ok(assigned.iter().any(|name| {
            roles
                .get(name)
                .is_some_and(|role| role.permissions.0.iter().any(|p| p == "*" || p == permission))
        }))
    }
}
