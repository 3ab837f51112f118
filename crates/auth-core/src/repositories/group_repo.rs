//! Group membership, consulted by SAML group sync (spec §4.4.3 step 7).
//! Group *management* (create/rename/delete a group) sits outside the hot
//! path and is not implemented here — only the membership list the sync
//! step needs.

use crate::error::AuthError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[async_trait]
pub trait GroupRepo: Send + Sync {
    async fn get_user_groups(&self, user_id: Uuid) -> Result<Vec<String>, AuthError>;
    /// Replaces the user's full group membership list.
    async fn set_user_groups(&self, user_id: Uuid, groups: Vec<String>) -> Result<(), AuthError>;
}

/// In-memory fake for tests.
#[derive(Default)]
pub struct InMemoryGroupRepo {
    groups: Mutex<HashMap<Uuid, Vec<String>>>,
}

#[async_trait]
impl GroupRepo for InMemoryGroupRepo {
    async fn get_user_groups(&self, user_id: Uuid) -> Result<Vec<String>, AuthError> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_user_groups(&self, user_id: Uuid, groups: Vec<String>) -> Result<(), AuthError> {
        self.groups.lock().unwrap().insert(user_id, groups);
        Ok(())
    }
}
