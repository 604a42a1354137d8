use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use tickbox_auth::{Identity, Role, User};
use tickbox_core::{DomainError, UserId};

use crate::store::{SessionStore, StoreError, UserStore};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("User not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DomainError> for AdminError {
    fn from(value: DomainError) -> Self {
        AdminError::Validation(value.to_string())
    }
}

/// User administration. Callers must already have passed the admin gate.
#[derive(Clone)]
pub struct AdminService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
}

impl AdminService {
    pub fn new(users: Arc<dyn UserStore>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { users, sessions }
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AdminError> {
        Ok(self.users.list_users().await?)
    }

    pub async fn set_role(&self, actor: &Identity, id: &str, role: Role) -> Result<User, AdminError> {
        let mut user = self.load(id).await?;
        user.set_role(actor, role, Utc::now())?;
        self.save(&user).await?;
        tracing::info!(actor = %actor.user_id, user_id = %user.id, role = %role, "role changed");
        Ok(user)
    }

    /// Ban a user and revoke all of their sessions.
    pub async fn ban_user(&self, actor: &Identity, id: &str, reason: Option<String>) -> Result<User, AdminError> {
        let mut user = self.load(id).await?;
        user.ban(actor, reason, Utc::now())?;
        self.save(&user).await?;
        let revoked = self.sessions.revoke_user_sessions(user.id, None).await?;
        tracing::info!(actor = %actor.user_id, user_id = %user.id, revoked, "user banned");
        Ok(user)
    }

    pub async fn unban_user(&self, actor: &Identity, id: &str) -> Result<User, AdminError> {
        let mut user = self.load(id).await?;
        user.unban(Utc::now());
        self.save(&user).await?;
        tracing::info!(actor = %actor.user_id, user_id = %user.id, "user unbanned");
        Ok(user)
    }

    async fn load(&self, id: &str) -> Result<User, AdminError> {
        let id: UserId = id.parse().map_err(|_| AdminError::NotFound)?;
        self.users.get_user(id).await?.ok_or(AdminError::NotFound)
    }

    async fn save(&self, user: &User) -> Result<(), AdminError> {
        if self.users.update_user(user).await? {
            Ok(())
        } else {
            Err(AdminError::NotFound)
        }
    }
}
