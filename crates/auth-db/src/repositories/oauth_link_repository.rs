//! MySQL-backed `OAuthLinkRepo`.

use async_trait::async_trait;
use auth_core::error::AuthError;
use auth_core::models::oauth::OAuthLink;
use auth_core::repositories::oauth_link_repo::OAuthLinkRepo;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;
use uuid::Uuid;

const OAUTH_LINK_COLUMNS: &str = "id, user_id, provider, provider_user_id, \
    access_token_encrypted, refresh_token_encrypted, expires_at, created_at, updated_at";

#[derive(Clone)]
pub struct MySqlOAuthLinkRepository {
    pool: MySqlPool,
}

impl MySqlOAuthLinkRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OAuthLinkRepo for MySqlOAuthLinkRepository {
    async fn upsert(
        &self,
        user_id: Uuid,
        provider: &str,
        provider_user_id: &str,
        access_token_encrypted: String,
        refresh_token_encrypted: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<OAuthLink, AuthError> {
        let now = Utc::now();
        let existing = self.get_by_provider(provider, provider_user_id).await?;

        if let Some(existing) = existing {
            sqlx::query(
                r#"
                UPDATE oauth_links SET
                    user_id = ?, access_token_encrypted = ?, refresh_token_encrypted = ?,
                    expires_at = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(user_id.to_string())
            .bind(&access_token_encrypted)
            .bind(&refresh_token_encrypted)
            .bind(expires_at)
            .bind(now)
            .bind(existing.id.to_string())
            .execute(&self.pool)
            .await?;

            return self
                .get_by_provider(provider, provider_user_id)
                .await?
                .ok_or(AuthError::Internal);
        }

        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO oauth_links (
                id, user_id, provider, provider_user_id,
                access_token_encrypted, refresh_token_encrypted, expires_at, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(provider)
        .bind(provider_user_id)
        .bind(&access_token_encrypted)
        .bind(&refresh_token_encrypted)
        .bind(expires_at)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_by_provider(provider, provider_user_id)
            .await?
            .ok_or(AuthError::Internal)
    }

    async fn get_by_provider(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<OAuthLink>, AuthError> {
        let link = sqlx::query_as::<_, OAuthLink>(&format!(
            "SELECT {OAUTH_LINK_COLUMNS} FROM oauth_links WHERE provider = ? AND provider_user_id = ?"
        ))
        .bind(provider)
        .bind(provider_user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(link)
    }

    async fn get_by_user(&self, user_id: Uuid) -> Result<Vec<OAuthLink>, AuthError> {
        let links = sqlx::query_as::<_, OAuthLink>(&format!(
            "SELECT {OAUTH_LINK_COLUMNS} FROM oauth_links WHERE user_id = ?"
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        Ok(links)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM oauth_links WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
