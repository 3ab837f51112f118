use crate::error::AuthError;
use crate::models::oauth::OAuthLink;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
pub trait OAuthLinkRepo: Send + Sync {
    /// Upsert keyed on (provider, provider_user_id): two calls with the same
    /// key yield one row.
    #[allow(clippy::too_many_arguments)]
    async fn upsert(
        &self,
        user_id: Uuid,
        provider: &str,
        provider_user_id: &str,
        access_token_encrypted: String,
        refresh_token_encrypted: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<OAuthLink, AuthError>;

    async fn get_by_provider(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<OAuthLink>, AuthError>;

    async fn get_by_user(&self, user_id: Uuid) -> Result<Vec<OAuthLink>, AuthError>;
    async fn delete(&self, id: Uuid) -> Result<(), AuthError>;
}

/// In-memory fake for integration tests: same upsert-by-(provider,
/// provider_user_id) semantics as `MySqlOAuthLinkRepository`.
#[derive(Default)]
pub struct InMemoryOAuthLinkRepo {
    links: std::sync::Mutex<std::collections::HashMap<Uuid, OAuthLink>>,
}

#[async_trait]
impl OAuthLinkRepo for InMemoryOAuthLinkRepo {
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
        let mut links = self.links.lock().unwrap();
        let existing_id = links
            .values()
            .find(|l| l.provider == provider && l.provider_user_id == provider_user_id)
            .map(|l| l.id);

        let id = existing_id.unwrap_or_else(Uuid::new_v4);
        let created_at = existing_id.and_then(|id| links.get(&id)).map(|l| l.created_at).unwrap_or(now);
        let link = OAuthLink {
            id,
            user_id,
            provider: provider.to_string(),
            provider_user_id: provider_user_id.to_string(),
            access_token_encrypted,
            refresh_token_encrypted,
            expires_at,
            created_at,
            updated_at: now,
        };
        links.insert(id, link.clone());
        Ok(link)
    }

    async fn get_by_provider(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<OAuthLink>, AuthError> {
        Ok(self
            .links
            .lock()
            .unwrap()
            .values()
            .find(|l| l.provider == provider && l.provider_user_id == provider_user_id)
            .cloned())
    }

    async fn get_by_user(&self, user_id: Uuid) -> Result<Vec<OAuthLink>, AuthError> {
        Ok(self
            .links
            .lock()
            .unwrap()
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AuthError> {
        self.links.lock().unwrap().remove(&id);
        Ok(())
    }
}
