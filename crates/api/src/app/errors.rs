//! Response envelope and error → status mapping.
//!
//! Every JSON body is `{success, message?, data?}`; errors add a stable
//! machine-readable `code`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use tickbox_infra::services::{AdminError, AuthError, TodoError};
use tickbox_infra::store::StoreError;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

pub fn json_ok<T: Serialize>(status: StatusCode, body: ApiResponse<T>) -> Response {
    (status, Json(body)).into_response()
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "code": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Store failures look the same from every handler: logged, then a generic 500.
pub fn store_error_to_response(operation: &'static str, err: StoreError) -> Response {
    tracing::error!(operation, error = %err, "store failure");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "Something went wrong. Please try again later.",
    )
}

pub fn todo_error_to_response(operation: &'static str, err: TodoError) -> Response {
    match err {
        TodoError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "Todo not found"),
        TodoError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
        TodoError::Store(e) => store_error_to_response(operation, e),
    }
}

pub fn auth_error_to_response(operation: &'static str, err: AuthError) -> Response {
    match err {
        AuthError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        e @ AuthError::UserAlreadyExists => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "user_already_exists", e.to_string())
        }
        e @ AuthError::InvalidCredentials => json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", e.to_string()),
        e @ AuthError::InvalidPassword => json_error(StatusCode::BAD_REQUEST, "invalid_password", e.to_string()),
        e @ AuthError::Banned => json_error(StatusCode::FORBIDDEN, "banned", e.to_string()),
        e @ AuthError::UnknownProvider(_) => json_error(StatusCode::NOT_FOUND, "provider_not_found", e.to_string()),
        e @ AuthError::InvalidState => json_error(StatusCode::BAD_REQUEST, "invalid_state", e.to_string()),
        AuthError::OAuth(e) => {
            tracing::warn!(operation, error = %e, "oauth provider call failed");
            json_error(StatusCode::BAD_GATEWAY, "oauth_error", "Could not complete sign-in with the provider")
        }
        AuthError::Internal(msg) => {
            tracing::error!(operation, error = %msg, "internal auth failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Something went wrong. Please try again later.")
        }
        AuthError::Store(e) => store_error_to_response(operation, e),
    }
}

pub fn admin_error_to_response(operation: &'static str, err: AdminError) -> Response {
    match err {
        AdminError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "User not found"),
        AdminError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        AdminError::Store(e) => store_error_to_response(operation, e),
    }
}
