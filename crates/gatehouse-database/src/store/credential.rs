//! Credential store contract.

use async_trait::async_trait;
use uuid::Uuid;

use gatehouse_core::AppResult;
use gatehouse_entity::user::{NewUser, User};

/// Persisted users and their password hashes.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Case-insensitive lookup.
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Insert a user. Duplicate username or email yields `Conflict`.
    async fn create(&self, data: &NewUser) -> AppResult<User>;

    /// Replace the password hash. Returns `false` if the user does not exist.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<bool>;

    /// All users ordered by creation time.
    async fn list(&self) -> AppResult<Vec<User>>;
}
