//! Authorization predicates: authenticated, admin, owner.
//!
//! - No IO
//! - No panics
//! - No business logic (pure policy checks)

use thiserror::Error;

use tickbox_core::UserId;

use crate::Identity;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// No valid session accompanied the request.
    #[error("Unauthorized")]
    Unauthenticated,

    /// Authenticated, but not allowed to do this.
    #[error("{0}")]
    Forbidden(String),
}

impl AuthzError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
}

/// A resource with exactly one owning user.
pub trait Owned {
    fn owner_id(&self) -> UserId;
}

impl<T: Owned + ?Sized> Owned for &T {
    fn owner_id(&self) -> UserId {
        (**self).owner_id()
    }
}

/// Gate: the request must carry a resolved identity.
pub fn require_identity(identity: Option<Identity>) -> Result<Identity, AuthzError> {
    identity.ok_or(AuthzError::Unauthenticated)
}

/// Gate: the identity must hold the admin role.
pub fn require_admin(identity: &Identity) -> Result<(), AuthzError> {
    if identity.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::forbidden("Forbidden"))
    }
}

/// Ownership check shared by every mutating handler.
///
/// Admins get no bypass: a todo is only ever touched by its owner.
pub fn authorize_owner<R: Owned>(resource: &R, identity: &Identity) -> Result<(), AuthzError> {
    if resource.owner_id() == identity.user_id {
        Ok(())
    } else {
        Err(AuthzError::forbidden("You are not authorized to modify this resource"))
    }
}
