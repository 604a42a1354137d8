use serde::{Deserialize, Serialize};

use tickbox_core::UserId;

use crate::Role;

/// The acting identity of an authorized request.
///
/// This is what the authorization gate hands to handlers once a session has
/// been resolved. It carries no credential material.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
