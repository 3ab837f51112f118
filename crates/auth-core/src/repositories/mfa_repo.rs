//! MFA secret storage contract. Outside the hot path (spec §4.6) — a trait
//! and an in-memory fake only, no transport surface, no MySQL-backed
//! implementation.

use crate::error::AuthError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[async_trait]
pub trait MfaRepo: Send + Sync {
    async fn get_secret(&self, user_id: Uuid) -> Result<Option<String>, AuthError>;
    async fn set_secret(&self, user_id: Uuid, secret: String) -> Result<(), AuthError>;
    async fn clear_secret(&self, user_id: Uuid) -> Result<(), AuthError>;
}

#[derive(Default)]
pub struct InMemoryMfaRepo {
    secrets: Mutex<HashMap<Uuid, String>>,
}

#[async_trait]
impl MfaRepo for InMemoryMfaRepo {
    async fn get_secret(&self, user_id: Uuid) -> Result<Option<String>, AuthError> {
        Ok(self.secrets.lock().unwrap().get(&user_id).cloned())
    }

    async fn set_secret(&self, user_id: Uuid, secret: String) -> Result<(), AuthError> {
        self.secrets.lock().unwrap().insert(user_id, secret);
        Ok(())
    }

    async fn clear_secret(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.secrets.lock().unwrap().remove(&user_id);
        Ok(())
    }
}
