//! Users and the credential/provider accounts linked to them.
//!
//! State transitions here are pure: callers load a `User`, apply a change, and
//! persist the result. Admin-facing transitions guard against self-lockout.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tickbox_core::{AccountId, DomainError, UserId};

use crate::{Identity, Role};

pub const MAX_NAME_LEN: usize = 30;

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

/// A registered user.
///
/// # Invariants
/// - `email` is stored trimmed and lowercase, and is unique across users.
/// - Banned users cannot sign in and have no live sessions.
/// - An admin cannot demote or ban themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    pub image: Option<String>,
    pub role: Role,
    pub banned: bool,
    pub ban_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Register a new user with the default role.
    pub fn register(name: &str, email: &str, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let name = validate_name(name)?;
        let email = validate_email(email)?;
        Ok(Self {
            id: UserId::new(),
            name,
            email,
            email_verified: false,
            image: None,
            role: Role::default(),
            banned: false,
            ban_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.id, self.role)
    }

    /// Change this user's role on behalf of `actor`.
    pub fn set_role(&mut self, actor: &Identity, role: Role, now: DateTime<Utc>) -> Result<(), DomainError> {
        if actor.user_id == self.id && !role.is_admin() {
            return Err(DomainError::validation("admins cannot remove their own admin role"));
        }
        if self.role != role {
            self.role = role;
            self.updated_at = now;
        }
        Ok(())
    }

    /// Ban this user on behalf of `actor`. Session revocation is the caller's job.
    pub fn ban(&mut self, actor: &Identity, reason: Option<String>, now: DateTime<Utc>) -> Result<(), DomainError> {
        if actor.user_id == self.id {
            return Err(DomainError::validation("admins cannot ban themselves"));
        }
        self.banned = true;
        self.ban_reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        self.updated_at = now;
        Ok(())
    }

    pub fn unban(&mut self, now: DateTime<Utc>) {
        if self.banned {
            self.banned = false;
            self.ban_reason = None;
            self.updated_at = now;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

/// Where an account's credential comes from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Email + password, verified locally.
    Credential,
    Github,
    Google,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Credential => "credential",
            ProviderId::Github => "github",
            ProviderId::Google => "google",
        }
    }
}

impl core::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credential" => Ok(ProviderId::Credential),
            "github" => Ok(ProviderId::Github),
            "google" => Ok(ProviderId::Google),
            other => Err(DomainError::validation(format!("unknown provider '{other}'"))),
        }
    }
}

/// Credential material bound to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    pub provider_id: ProviderId,
    /// Provider-side account id. For `credential` accounts this is the user id.
    pub account_id: String,
    /// argon2 PHC string; only set for `credential` accounts.
    pub password_hash: Option<String>,
    pub access_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn credential(user_id: UserId, password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id: AccountId::new(),
            user_id,
            provider_id: ProviderId::Credential,
            account_id: user_id.to_string(),
            password_hash: Some(password_hash),
            access_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn oauth(user_id: UserId, profile: &OAuthProfile, now: DateTime<Utc>) -> Self {
        Self {
            id: AccountId::new(),
            user_id,
            provider_id: profile.provider,
            account_id: profile.account_id.clone(),
            password_hash: None,
            access_token: profile.access_token.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Identity returned by an OAuth provider after a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    pub provider: ProviderId,
    pub account_id: String,
    pub email: String,
    pub email_verified: bool,
    pub name: String,
    pub image: Option<String>,
    pub access_token: Option<String>,
}

impl OAuthProfile {
    /// Build the user a first-time social login creates.
    ///
    /// Provider names are clamped to the sign-up limit rather than rejected.
    pub fn to_user(&self, now: DateTime<Utc>) -> Result<User, DomainError> {
        let fallback = self.email.split('@').next().unwrap_or("user").to_string();
        let name: String = if self.name.trim().is_empty() { fallback } else { self.name.trim().to_string() };
        let name: String = name.chars().take(MAX_NAME_LEN).collect();

        let mut user = User::register(&name, &self.email, now)?;
        user.email_verified = self.email_verified;
        user.image = self.image.clone();
        Ok(user)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Input validation
// ─────────────────────────────────────────────────────────────────────────────

/// Email/password sign-up payload.
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SignUpInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_name(&self.name)?;
        validate_email(&self.email)?;
        crate::validate_password(&self.password).map_err(|e| DomainError::validation(e.to_string()))
    }
}

/// Trimmed display name, 1..=30 characters.
pub fn validate_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("Name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::validation(format!(
            "Name must be at most {MAX_NAME_LEN} characters long"
        )));
    }
    Ok(name.to_string())
}

/// Lowercase, trimmed email.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Syntactic email check; returns the normalized address.
pub fn validate_email(email: &str) -> Result<String, DomainError> {
    let email = normalize_email(email);
    let invalid = || DomainError::validation("Invalid email address");

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(email)
}
