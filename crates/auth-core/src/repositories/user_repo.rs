use crate::error::AuthError;
use crate::models::user::{CreateUserRequest, UpdateUserRequest, User, UserListFilters};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create(
        &self,
        req: CreateUserRequest,
        password_hash: String,
    ) -> Result<User, AuthError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError>;
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;
    async fn update(&self, id: Uuid, req: UpdateUserRequest) -> Result<User, AuthError>;
    async fn update_password(&self, id: Uuid, password_hash: String) -> Result<(), AuthError>;
    /// Soft-delete: sets `active = false`. The core never hard-deletes users.
    async fn delete(&self, id: Uuid) -> Result<(), AuthError>;
    async fn list(
        &self,
        page: u32,
        size: u32,
        filters: UserListFilters,
    ) -> Result<(Vec<User>, u64), AuthError>;
}

/// In-memory fake for integration tests: no database, same uniqueness and
/// soft-delete semantics as `MySqlUserRepository`.
#[derive(Default)]
pub struct InMemoryUserRepo {
    users: std::sync::Mutex<std::collections::HashMap<Uuid, User>>,
}

#[async_trait]
impl UserRepo for InMemoryUserRepo {
    async fn create(&self, req: CreateUserRequest, password_hash: String) -> Result<User, AuthError> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == req.email) {
            return Err(AuthError::AlreadyExists {
                message: "duplicate entry".to_string(),
            });
        }
        let now = chrono::Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: req.email,
            password_hash,
            given_name: req.given_name,
            family_name: req.family_name,
            phone: req.phone,
            avatar: None,
            bio: None,
            timezone: None,
            active: true,
            organization: req.organization,
            auth_method: req.auth_method,
            created_at: now,
            updated_at: now,
            roles: Vec::new(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self.users.lock().unwrap().values().find(|u| u.email == email).cloned())
    }

    async fn update(&self, id: Uuid, req: UpdateUserRequest) -> Result<User, AuthError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&id).ok_or(AuthError::NotFound)?;
        if req.given_name.is_some() {
            user.given_name = req.given_name;
        }
        if req.family_name.is_some() {
            user.family_name = req.family_name;
        }
        if req.phone.is_some() {
            user.phone = req.phone;
        }
        if req.avatar.is_some() {
            user.avatar = req.avatar;
        }
        if req.bio.is_some() {
            user.bio = req.bio;
        }
        if req.timezone.is_some() {
            user.timezone = req.timezone;
        }
        if req.organization.is_some() {
            user.organization = req.organization;
        }
        user.updated_at = chrono::Utc::now();
        Ok(user.clone())
    }

    async fn update_password(&self, id: Uuid, password_hash: String) -> Result<(), AuthError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&id).ok_or(AuthError::NotFound)?;
        user.password_hash = password_hash;
        user.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AuthError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&id).ok_or(AuthError::NotFound)?;
        user.active = false;
        user.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn list(
        &self,
        page: u32,
        size: u32,
        filters: UserListFilters,
    ) -> Result<(Vec<User>, u64), AuthError> {
        let users = self.users.lock().unwrap();
        let mut matching: Vec<User> = users
            .values()
            .filter(|u| match &filters.search {
                Some(search) => {
                    u.email.contains(search.as_str())
                        || u.given_name.as_deref().is_some_and(|g| g.contains(search.as_str()))
                        || u.family_name.as_deref().is_some_and(|f| f.contains(search.as_str()))
                }
                None => true,
            })
            .filter(|u| filters.active.map_or(true, |active| u.active == active))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let offset = (page.saturating_sub(1)) as usize * size as usize;
        let page_items = matching.into_iter().skip(offset).take(size as usize).collect();
        Ok((page_items, total))
    }
}
