use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{CredentialStore, StoreError, User};
use crate::auth::hash_password;
use crate::error::AppError;

pub const DEFAULT_ADMIN_ID: &str = "00000000-0000-0000-0000-000000000000";
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Credential store kept in process memory, keyed by user id
#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding only the bootstrap administrator account
    pub fn with_default_admin(hash_cost: u32) -> Result<Self, AppError> {
        let store = Self::new();
        store.insert(User {
            id: DEFAULT_ADMIN_ID.to_string(),
            username: DEFAULT_ADMIN_USERNAME.to_string(),
            email: DEFAULT_ADMIN_EMAIL.to_string(),
            password_hash: hash_password(DEFAULT_ADMIN_PASSWORD, hash_cost)?,
            roles: vec!["admin".to_string(), "user".to_string()],
        })?;
        Ok(store)
    }

    /// Insert or replace a user record
    pub fn insert(&self, user: User) -> Result<(), AppError> {
        let mut users = self
            .users
            .write()
            .map_err(|e| AppError::Internal(format!("credential store lock poisoned: {}", e)))?;
        users.insert(user.id.clone(), user);
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Option<User> {
        self.users.write().ok()?.remove(id)
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_user(&self, username_or_email: &str) -> Result<User, StoreError> {
        let users = self
            .users
            .read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        users
            .values()
            .find(|u| u.username == username_or_email || u.email == username_or_email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_user_by_id(&self, id: &str) -> Result<User, StoreError> {
        let users = self
            .users
            .read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        users.get(id).cloned().ok_or(StoreError::NotFound)
    }
}
