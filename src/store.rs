/// User record model and the record-store collaborator contract
///
/// The engine never owns persistence: the host application implements
/// `UserStore` over whatever storage it already runs. `MemoryUserStore` is
/// provided for tests and small embedded deployments.
use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// One account as the engine sees it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Normalized unique identifier, immutable after creation
    pub username: String,
    /// Argon2id hash of the current password, never the clear form
    pub password_hash: String,
    /// Present when self-approval or email-on-signup is enabled
    pub email: Option<String>,
    /// Gates login regardless of correct credentials
    pub is_authorized: bool,
    /// Second-factor enrollment state
    pub has_2fa: bool,
    /// Base32 TOTP secret, set when 2FA was requested at creation
    pub otp_secret: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Record-store contract consumed by the engine
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a record by normalized username
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<UserRecord>>;

    /// Insert a new record; `Conflict` when the username already exists,
    /// including when two signups race
    async fn insert(&self, record: UserRecord) -> AuthResult<()>;

    /// Replace an existing record
    async fn update(&self, record: UserRecord) -> AuthResult<()>;

    /// Remove a record by username
    async fn delete(&self, username: &str) -> AuthResult<()>;

    /// All records, for administrative listing
    async fn list_all(&self) -> AuthResult<Vec<UserRecord>>;
}

/// In-memory store keyed by username
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users.get(username).cloned())
    }

    async fn insert(&self, record: UserRecord) -> AuthResult<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&record.username) {
            return Err(AuthError::Conflict(format!(
                "Username {} already taken",
                record.username
            )));
        }
        users.insert(record.username.clone(), record);
        Ok(())
    }

    async fn update(&self, record: UserRecord) -> AuthResult<()> {
        let mut users = self.users.write().await;
        if !users.contains_key(&record.username) {
            return Err(AuthError::NoSuchUser(record.username));
        }
        users.insert(record.username.clone(), record);
        Ok(())
    }

    async fn delete(&self, username: &str) -> AuthResult<()> {
        let mut users = self.users.write().await;
        users
            .remove(username)
            .map(|_| ())
            .ok_or_else(|| AuthError::NoSuchUser(username.to_string()))
    }

    async fn list_all(&self) -> AuthResult<Vec<UserRecord>> {
        let users = self.users.read().await;
        Ok(users.values().cloned().collect())
    }
}
