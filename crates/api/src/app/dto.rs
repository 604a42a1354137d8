use serde::{Deserialize, Serialize};

use tickbox_auth::{Role, Session, SignUpInput, User, validate_email};
use tickbox_todos::{CreateTodoInput, NewTodo, UpdateTodoInput};

use crate::app::extract::Validate;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
    #[serde(default = "remember_me_default")]
    pub remember_me: bool,
}

fn remember_me_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    #[serde(default)]
    pub revoke_other_sessions: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct BanUserRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SocialCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

// -------------------------
// Validation
// -------------------------

impl Validate for CreateTodoInput {
    type Valid = NewTodo;

    fn validate(self) -> Result<NewTodo, String> {
        CreateTodoInput::validate(&self).map_err(|e| e.to_string())
    }
}

impl Validate for UpdateTodoInput {
    type Valid = bool;

    fn validate(self) -> Result<bool, String> {
        Ok(self.completed)
    }
}

impl Validate for SignUpInput {
    type Valid = SignUpInput;

    fn validate(self) -> Result<SignUpInput, String> {
        SignUpInput::validate(&self).map_err(|e| e.to_string())?;
        Ok(self)
    }
}

impl Validate for SignInRequest {
    type Valid = SignInRequest;

    fn validate(self) -> Result<SignInRequest, String> {
        validate_email(&self.email).map_err(|e| e.to_string())?;
        if self.password.is_empty() {
            return Err("Password is required".to_string());
        }
        Ok(self)
    }
}

impl Validate for ChangePasswordRequest {
    type Valid = ChangePasswordRequest;

    fn validate(self) -> Result<ChangePasswordRequest, String> {
        if self.current_password.is_empty() {
            return Err("Current password is required".to_string());
        }
        tickbox_auth::validate_password(&self.new_password).map_err(|e| e.to_string())?;
        Ok(self)
    }
}

impl Validate for SetRoleRequest {
    type Valid = Role;

    fn validate(self) -> Result<Role, String> {
        self.role.parse::<Role>()
    }
}

impl Validate for BanUserRequest {
    type Valid = Option<String>;

    fn validate(self) -> Result<Option<String>, String> {
        match self.reason.as_deref().map(str::trim) {
            Some(reason) if reason.chars().count() > 500 => {
                Err("Ban reason must be at most 500 characters".to_string())
            }
            _ => Ok(self.reason),
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

/// Body of a successful sign-up/sign-in.
#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

/// Body of `get-session`.
#[derive(Debug, Serialize)]
pub struct SessionPayload<'a> {
    pub session: &'a Session,
    pub user: &'a User,
}
