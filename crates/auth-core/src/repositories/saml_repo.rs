use crate::error::AuthError;
use crate::models::saml::SamlSession;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait SamlRepo: Send + Sync {
    async fn create_session(&self, session: SamlSession) -> Result<SamlSession, AuthError>;
    /// Returns `None` for a session that exists but has expired — the caller
    /// must not distinguish that from "never existed".
    async fn get_session_by_id(&self, id: Uuid) -> Result<Option<SamlSession>, AuthError>;
    async fn delete_expired_sessions(&self) -> Result<u64, AuthError>;
}

/// In-memory fake for integration tests: same "expired looks absent"
/// semantics as `MySqlSamlRepository`.
#[derive(Default)]
pub struct InMemorySamlRepo {
    sessions: std::sync::Mutex<std::collections::HashMap<Uuid, SamlSession>>,
}

#[async_trait]
impl SamlRepo for InMemorySamlRepo {
    async fn create_session(&self, session: SamlSession) -> Result<SamlSession, AuthError> {
        self.sessions.lock().unwrap().insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session_by_id(&self, id: Uuid) -> Result<Option<SamlSession>, AuthError> {
        let now = chrono::Utc::now();
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(&id)
            .filter(|s| s.expires_at > now)
            .cloned())
    }

    async fn delete_expired_sessions(&self) -> Result<u64, AuthError> {
        let now = chrono::Utc::now();
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        Ok((before - sessions.len()) as u64)
    }
}
