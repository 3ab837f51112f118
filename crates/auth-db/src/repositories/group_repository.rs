//! MySQL-backed `GroupRepo`, used by SAML group sync (spec §4.4.3 step 7).

use async_trait::async_trait;
use auth_core::error::AuthError;
use auth_core::repositories::group_repo::GroupRepo;
use sqlx::MySqlPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct MySqlGroupRepository {
    pool: MySqlPool,
}

impl MySqlGroupRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupRepo for MySqlGroupRepository {
    async fn get_user_groups(&self, user_id: Uuid) -> Result<Vec<String>, AuthError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT group_name FROM user_groups WHERE user_id = ?")
                .bind(user_id.to_string())
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn set_user_groups(&self, user_id: Uuid, groups: Vec<String>) -> Result<(), AuthError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM user_groups WHERE user_id = ?")
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await?;
        for group in &groups {
            sqlx::query("INSERT INTO user_groups (user_id, group_name) VALUES (?, ?)")
                .bind(user_id.to_string())
                .bind(group)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
