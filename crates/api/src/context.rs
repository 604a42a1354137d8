use tickbox_auth::{Identity, Session, User};
use tickbox_infra::services::ResolvedSession;

/// Session context for a request (resolved session + its user).
///
/// Inserted by the session middleware when the request carries a valid
/// credential; absent otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    resolved: ResolvedSession,
}

impl SessionContext {
    pub fn new(resolved: ResolvedSession) -> Self {
        Self { resolved }
    }

    pub fn identity(&self) -> Identity {
        self.resolved.identity()
    }

    pub fn session(&self) -> &Session {
        &self.resolved.session
    }

    pub fn user(&self) -> &User {
        &self.resolved.user
    }

    pub fn resolved(&self) -> &ResolvedSession {
        &self.resolved
    }
}
