//! Password policy and argon2 hashing.

use std::sync::OnceLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>_-+=/\\[]~`";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Password must be at least {MIN_PASSWORD_LEN} characters long")]
    TooShort,

    #[error("Password must be at most {MAX_PASSWORD_LEN} characters long")]
    TooLong,

    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,

    #[error("Password must contain at least one number")]
    MissingDigit,

    #[error("Password must contain at least one special character")]
    MissingSpecial,

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Check a new password against the sign-up policy.
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(PasswordError::TooShort);
    }
    if len > MAX_PASSWORD_LEN {
        return Err(PasswordError::TooLong);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PasswordError::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordError::MissingDigit);
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Err(PasswordError::MissingSpecial);
    }
    Ok(())
}

/// Hash a password into a PHC string (argon2id, random salt).
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Verify a password against a stored PHC string.
///
/// A malformed stored hash verifies as `false`; it is logged, not surfaced.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is malformed");
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Spend the same argon2 work as [`verify_password`] when there is no stored
/// hash to check against. Always `false`.
///
/// Keeps unknown-email sign-ins from answering measurably faster than
/// wrong-password ones.
pub fn verify_dummy_password(password: &str) -> bool {
    let hash = DUMMY_HASH.get_or_init(|| hash_password("tickbox-dummy-Passw0rd!").ok());
    if let Some(hash) = hash {
        let _ = verify_password(password, hash);
    }
    false
}
