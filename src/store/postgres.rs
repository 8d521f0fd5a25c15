use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{CredentialStore, StoreError, User};

type UserRow = (Uuid, String, String, String, Vec<String>);

/// Credential store backed by the `users` table
///
/// Expects `users(id UUID, username TEXT, email TEXT, pass_hash TEXT,
/// roles TEXT[])`; schema management happens elsewhere.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            other => StoreError::Backend(other.to_string()),
        }
    }
}

fn into_user((id, username, email, password_hash, roles): UserRow) -> User {
    User {
        id: id.to_string(),
        username,
        email,
        password_hash,
        roles,
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_user(&self, username_or_email: &str) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, pass_hash, roles
            FROM users
            WHERE username = $1 OR email = $1
            "#,
        )
        .bind(username_or_email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(into_user).ok_or(StoreError::NotFound)
    }

    async fn find_user_by_id(&self, id: &str) -> Result<User, StoreError> {
        // No row can carry an id that is not a UUID
        let id = Uuid::parse_str(id).map_err(|_| StoreError::NotFound)?;

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, pass_hash, roles
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(into_user).ok_or(StoreError::NotFound)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
