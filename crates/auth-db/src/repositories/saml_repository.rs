//! MySQL-backed `SamlRepo`.

use async_trait::async_trait;
use auth_core::error::AuthError;
use auth_core::models::saml::SamlSession;
use auth_core::repositories::saml_repo::SamlRepo;
use chrono::Utc;
use sqlx::MySqlPool;
use uuid::Uuid;

const SAML_SESSION_COLUMNS: &str =
    "id, user_id, config_key, idp_session_index, name_id, attributes, expires_at, created_at";

#[derive(Clone)]
pub struct MySqlSamlRepository {
    pool: MySqlPool,
}

impl MySqlSamlRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SamlRepo for MySqlSamlRepository {
    async fn create_session(&self, session: SamlSession) -> Result<SamlSession, AuthError> {
        sqlx::query(
            r#"
            INSERT INTO saml_sessions (
                id, user_id, config_key, idp_session_index, name_id, attributes, expires_at, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(session.id.to_string())
        .bind(session.user_id.to_string())
        .bind(&session.config_key)
        .bind(&session.idp_session_index)
        .bind(&session.name_id)
        .bind(&session.attributes)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;

        Ok(session)
    }

    async fn get_session_by_id(&self, id: Uuid) -> Result<Option<SamlSession>, AuthError> {
        let session = sqlx::query_as::<_, SamlSession>(&format!(
            "SELECT {SAML_SESSION_COLUMNS} FROM saml_sessions WHERE id = ? AND expires_at > ?"
        ))
        .bind(id.to_string())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn delete_expired_sessions(&self) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM saml_sessions WHERE expires_at <= ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
