use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use tickbox_core::{SessionId, UserId};

/// Opaque session credential handed to the client (cookie or bearer token).
///
/// Only its SHA-256 digest is ever persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a fresh random token (two v4 UUIDs, 244 random bits).
    pub fn generate() -> Self {
        Self(format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        ))
    }

    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase hex SHA-256 of the token; the lookup key in the session store.
    pub fn hash(&self) -> String {
        format!("{:x}", Sha256::digest(self.0.as_bytes()))
    }
}

impl core::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Server-side binding of a token to a user, with a validity window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Session {
    /// Start a session for `user_id` valid for `ttl` from `now`.
    pub fn start(user_id: UserId, token: &SessionToken, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            user_id,
            token_hash: token.hash(),
            created_at: now,
            expires_at: now + ttl,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionValidationError {
    #[error("session has expired")]
    Expired,

    #[error("invalid session window (expires_at <= created_at)")]
    InvalidTimeWindow,
}

/// Deterministically check a session's validity window against `now`.
///
/// `created_at` is not compared with `now`: it comes from whichever node issued
/// the session, and that node's clock may run ahead of ours.
pub fn validate_session(session: &Session, now: DateTime<Utc>) -> Result<(), SessionValidationError> {
    if session.expires_at <= session.created_at {
        return Err(SessionValidationError::InvalidTimeWindow);
    }
    if session.is_expired(now) {
        return Err(SessionValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_hash_stably() {
        let a = SessionToken::generate();
        let b = SessionToken::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert_eq!(a.hash(), SessionToken::from_raw(a.as_str()).hash());
        assert_ne!(a.hash(), b.hash());
        assert_eq!(a.hash().len(), 64);
    }

    #[test]
    fn debug_does_not_leak_token() {
        let t = SessionToken::from_raw("secret-value");
        assert!(!format!("{t:?}").contains("secret-value"));
    }

    #[test]
    fn session_window_is_enforced() {
        let now = Utc::now();
        let token = SessionToken::generate();
        let s = Session::start(UserId::new(), &token, Duration::hours(1), now);

        assert_eq!(validate_session(&s, now), Ok(()));
        assert_eq!(
            validate_session(&s, now + Duration::hours(1)),
            Err(SessionValidationError::Expired)
        );
        // Issued by a node whose clock is ahead of ours.
        assert_eq!(validate_session(&s, now - Duration::seconds(5)), Ok(()));

        let broken = Session::start(UserId::new(), &token, Duration::zero(), now);
        assert_eq!(
            validate_session(&broken, now),
            Err(SessionValidationError::InvalidTimeWindow)
        );
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// A session is valid until `expires_at`, however far `now` lags `created_at`.
            #[test]
            fn valid_until_expiry(ttl_secs in 1i64..100_000, offset in -100_000i64..200_000) {
                let created = Utc::now();
                let s = Session::start(UserId::new(), &SessionToken::generate(), Duration::seconds(ttl_secs), created);
                let at = created + Duration::seconds(offset);
                let inside = offset < ttl_secs;
                prop_assert_eq!(validate_session(&s, at).is_ok(), inside);
            }
        }
    }
}
