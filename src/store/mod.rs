/// User credential store
///
/// Owned outside this service; the token engine only reads from it.

use async_trait::async_trait;

mod memory;
mod postgres;

pub use memory::{
    InMemoryCredentialStore, DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_ID, DEFAULT_ADMIN_PASSWORD,
    DEFAULT_ADMIN_USERNAME,
};
pub use postgres::PgCredentialStore;

/// User record as held by the credential store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Opaque stable identifier, never reassigned
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("user not found")]
    NotFound,
    #[error("credential store failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a user whose username or email equals the given value
    async fn find_user(&self, username_or_email: &str) -> Result<User, StoreError>;

    async fn find_user_by_id(&self, id: &str) -> Result<User, StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
