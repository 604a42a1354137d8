//! User administration. Every route sits behind AdminOnly.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
    Router,
};

use crate::app::dto::{BanUserRequest, SetRoleRequest};
use crate::app::errors::{self, ApiResponse};
use crate::app::extract::ValidJson;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::SessionContext;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router {
    Router::new()
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/:id/role", post(set_role))
        .route("/api/admin/users/:id/ban", post(ban_user))
        .route("/api/admin/users/:id/unban", post(unban_user))
        .route_layer(axum::middleware::from_fn(authz::admin_only))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/admin/users - All users, newest first
pub async fn list_users(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.admin.list_users().await {
        Ok(users) => errors::json_ok(StatusCode::OK, ApiResponse::data(users)),
        Err(e) => errors::admin_error_to_response("list_users", e),
    }
}

/// POST /api/admin/users/:id/role - Grant or revoke admin
pub async fn set_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<String>,
    ValidJson(role): ValidJson<SetRoleRequest>,
) -> axum::response::Response {
    match services.admin.set_role(&ctx.identity(), &id, role).await {
        Ok(user) => errors::json_ok(StatusCode::OK, ApiResponse::data(user).with_message("Role updated")),
        Err(e) => errors::admin_error_to_response("set_role", e),
    }
}

/// POST /api/admin/users/:id/ban - Ban and sign out everywhere
pub async fn ban_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<String>,
    ValidJson(reason): ValidJson<BanUserRequest>,
) -> axum::response::Response {
    match services.admin.ban_user(&ctx.identity(), &id, reason).await {
        Ok(user) => errors::json_ok(StatusCode::OK, ApiResponse::data(user).with_message("User banned")),
        Err(e) => errors::admin_error_to_response("ban_user", e),
    }
}

/// POST /api/admin/users/:id/unban
pub async fn unban_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match services.admin.unban_user(&ctx.identity(), &id).await {
        Ok(user) => errors::json_ok(StatusCode::OK, ApiResponse::data(user).with_message("User unbanned")),
        Err(e) => errors::admin_error_to_response("unban_user", e),
    }
}
