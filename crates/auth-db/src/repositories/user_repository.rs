//! MySQL-backed `UserRepo`. Queries use `sqlx::query`/`query_as` with
//! explicit `.bind()` calls rather than the `query!` compile-time macro,
//! since no `.sqlx` offline cache is available in this workspace.

use async_trait::async_trait;
use auth_core::error::AuthError;
use auth_core::models::user::{CreateUserRequest, UpdateUserRequest, User, UserListFilters};
use auth_core::repositories::user_repo::UserRepo;
use chrono::Utc;
use sqlx::MySqlPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, password_hash, given_name, family_name, phone, avatar, \
    bio, timezone, active, organization, auth_method, created_at, updated_at";

#[derive(Clone)]
pub struct MySqlUserRepository {
    pool: MySqlPool,
}

impl MySqlUserRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepo for MySqlUserRepository {
    async fn create(&self, req: CreateUserRequest, password_hash: String) -> Result<User, AuthError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, password_hash, given_name, family_name, phone, avatar,
                bio, timezone, active, organization, auth_method, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, NULL, NULL, NULL, true, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&req.email)
        .bind(&password_hash)
        .bind(&req.given_name)
        .bind(&req.family_name)
        .bind(&req.phone)
        .bind(&req.organization)
        .bind(&req.auth_method)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(id).await?.ok_or(AuthError::Internal)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update(&self, id: Uuid, req: UpdateUserRequest) -> Result<User, AuthError> {
        let existing = self.get_by_id(id).await?.ok_or(AuthError::NotFound)?;
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE users SET
                given_name = ?, family_name = ?, phone = ?, avatar = ?,
                bio = ?, timezone = ?, organization = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(req.given_name.or(existing.given_name))
        .bind(req.family_name.or(existing.family_name))
        .bind(req.phone.or(existing.phone))
        .bind(req.avatar.or(existing.avatar))
        .bind(req.bio.or(existing.bio))
        .bind(req.timezone.or(existing.timezone))
        .bind(req.organization.or(existing.organization))
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        self.get_by_id(id).await?.ok_or(AuthError::Internal)
    }

    async fn update_password(&self, id: Uuid, password_hash: String) -> Result<(), AuthError> {
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AuthError> {
        sqlx::query("UPDATE users SET active = false, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(
        &self,
        page: u32,
        size: u32,
        filters: UserListFilters,
    ) -> Result<(Vec<User>, u64), AuthError> {
        let offset = (page.saturating_sub(1)) as i64 * size as i64;
        let search_pattern = filters.search.as_ref().map(|s| format!("%{s}%"));

        let mut query = format!("SELECT {USER_COLUMNS} FROM users WHERE 1 = 1");
        let mut count_query = "SELECT COUNT(*) FROM users WHERE 1 = 1".to_string();
        if search_pattern.is_some() {
            query.push_str(" AND (email LIKE ? OR given_name LIKE ? OR family_name LIKE ?)");
            count_query.push_str(" AND (email LIKE ? OR given_name LIKE ? OR family_name LIKE ?)");
        }
        if filters.active.is_some() {
            query.push_str(" AND active = ?");
            count_query.push_str(" AND active = ?");
        }
        if filters.role.is_some() {
            let role_exists = " AND EXISTS (SELECT 1 FROM user_roles ur JOIN roles r ON r.id = ur.role_id WHERE ur.user_id = users.id AND r.name = ?)";
            query.push_str(role_exists);
            count_query.push_str(role_exists);
        }
        query.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

        let mut items_builder = sqlx::query_as::<_, User>(&query);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        if let Some(pattern) = &search_pattern {
            items_builder = items_builder.bind(pattern).bind(pattern).bind(pattern);
            count_builder = count_builder.bind(pattern).bind(pattern).bind(pattern);
        }
        if let Some(active) = filters.active {
            items_builder = items_builder.bind(active);
            count_builder = count_builder.bind(active);
        }
        if let Some(role) = &filters.role {
            items_builder = items_builder.bind(role);
            count_builder = count_builder.bind(role);
        }
        items_builder = items_builder.bind(size as i64).bind(offset);

        let items = items_builder.fetch_all(&self.pool).await?;
        let total: i64 = count_builder.fetch_one(&self.pool).await?;

        Ok((items, total.max(0) as u64))
    }
}
