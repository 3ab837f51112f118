//! Parent-child user relationship contract (e.g. managed-account hierarchies).
//! Outside the hot path (spec §4.6) — a trait and an in-memory fake only.

use crate::error::AuthError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[async_trait]
pub trait ParentChildRepo: Send + Sync {
    async fn add_relation(&self, parent_id: Uuid, child_id: Uuid) -> Result<(), AuthError>;
    async fn remove_relation(&self, parent_id: Uuid, child_id: Uuid) -> Result<(), AuthError>;
    async fn get_children(&self, parent_id: Uuid) -> Result<Vec<Uuid>, AuthError>;
    async fn get_parent(&self, child_id: Uuid) -> Result<Option<Uuid>, AuthError>;
}

#[derive(Default)]
pub struct InMemoryParentChildRepo {
    children_by_parent: Mutex<HashMap<Uuid, Vec<Uuid>>>,
    parent_by_child: Mutex<HashMap<Uuid, Uuid>>,
}

#[async_trait]
impl ParentChildRepo for InMemoryParentChildRepo {
    async fn add_relation(&self, parent_id: Uuid, child_id: Uuid) -> Result<(), AuthError> {
        self.children_by_parent
            .lock()
            .unwrap()
            .entry(parent_id)
            .or_default()
            .push(child_id);
        self.parent_by_child.lock().unwrap().insert(child_id, parent_id);
        Ok(())
    }

    async fn remove_relation(&self, parent_id: Uuid, child_id: Uuid) -> Result<(), AuthError> {
        if let Some(children) = self.children_by_parent.lock().unwrap().get_mut(&parent_id) {
            children.retain(|c| *c != child_id);
        }
        self.parent_by_child.lock().unwrap().remove(&child_id);
        Ok(())
    }

    async fn get_children(&self, parent_id: Uuid) -> Result<Vec<Uuid>, AuthError> {
        Ok(self
            .children_by_parent
            .lock()
            .unwrap()
            .get(&parent_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_parent(&self, child_id: Uuid) -> Result<Option<Uuid>, AuthError> {
        Ok(self.parent_by_child.lock().unwrap().get(&child_id).copied())
    }
}
