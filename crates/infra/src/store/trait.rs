use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use tickbox_auth::{Account, ProviderId, Session, User};
use tickbox_core::{SessionId, TodoId, UserId};
use tickbox_todos::Todo;

/// Store operation error.
///
/// These are **infrastructure errors**. Absence of a record is not an error:
/// lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated (e.g. duplicate email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored row could not be mapped back into a domain value.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// The backend failed (connection, query, lock poisoning).
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Short-lived identifier → value pair (OAuth `state` and similar).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub id: Uuid,
    pub identifier: String,
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Users and their linked accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with `Conflict` if the email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Lookup by normalized (lowercase) email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// All users, newest first.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Overwrite a user's mutable fields. Returns `false` if the user is gone.
    async fn update_user(&self, user: &User) -> Result<bool, StoreError>;

    /// Remove a user with its accounts and sessions. Only used to undo a
    /// half-finished sign-up. Returns `false` if the user is gone.
    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError>;

    /// Link an account. Fails with `Conflict` if (provider, account_id) is taken.
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError>;

    async fn find_account(
        &self,
        provider: ProviderId,
        account_id: &str,
    ) -> Result<Option<Account>, StoreError>;

    async fn find_credential_account(&self, user_id: UserId) -> Result<Option<Account>, StoreError>;

    async fn update_account(&self, account: &Account) -> Result<(), StoreError>;
}

/// Server-side sessions, keyed by token hash.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: &Session) -> Result<(), StoreError>;

    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>, StoreError>;

    /// Returns whether a session was removed.
    async fn revoke_session(&self, token_hash: &str) -> Result<bool, StoreError>;

    /// Revoke every session of `user_id` except `keep`. Returns the number removed.
    async fn revoke_user_sessions(
        &self,
        user_id: UserId,
        keep: Option<SessionId>,
    ) -> Result<u64, StoreError>;

    /// Delete sessions that expired at or before `now`. Returns the number removed.
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait VerificationStore: Send + Sync {
    async fn insert_verification(&self, verification: &Verification) -> Result<(), StoreError>;

    /// Remove and return the entry for `identifier`, if present and unexpired at `now`.
    ///
    /// Consumed entries are deleted whether or not they had expired.
    async fn take_verification(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Verification>, StoreError>;

    /// Delete entries that expired at or before `now`. Returns the number removed.
    async fn purge_expired_verifications(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Todo rows. Ownership is enforced by callers, not here.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Todos owned by `owner`, newest first (ties: most recently inserted first).
    async fn list_todos(&self, owner: UserId) -> Result<Vec<Todo>, StoreError>;

    async fn insert_todo(&self, todo: &Todo) -> Result<(), StoreError>;

    async fn get_todo(&self, id: TodoId) -> Result<Option<Todo>, StoreError>;

    /// Returns `false` if no todo with `id` exists.
    async fn set_completed(
        &self,
        id: TodoId,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Returns `false` if no todo with `id` exists.
    async fn delete_todo(&self, id: TodoId) -> Result<bool, StoreError>;
}
