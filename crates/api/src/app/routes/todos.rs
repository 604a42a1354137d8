//! Todo CRUD. Every route sits behind AuthOnly and every mutation behind the
//! ownership check in `TodoService`.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, patch},
    Router,
};

use tickbox_todos::{CreateTodoInput, UpdateTodoInput};

use crate::app::errors::{self, ApiResponse};
use crate::app::extract::ValidJson;
use crate::app::services::AppServices;
use crate::context::SessionContext;
use crate::middleware;

pub fn router() -> Router {
    Router::new()
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/:id", patch(update_todo).delete(delete_todo))
        .route_layer(axum::middleware::from_fn(middleware::auth_only))
}

/// GET /api/todos
pub async fn list_todos(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
) -> axum::response::Response {
    match services.todos.list(&ctx.identity()).await {
        Ok(todos) => errors::json_ok(StatusCode::OK, ApiResponse::data(todos)),
        Err(e) => errors::todo_error_to_response("list_todos", e),
    }
}

/// POST /api/todos
pub async fn create_todo(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    ValidJson(new_todo): ValidJson<CreateTodoInput>,
) -> axum::response::Response {
    match services.todos.create(&ctx.identity(), new_todo).await {
        Ok(todo) => errors::json_ok(
            StatusCode::CREATED,
            ApiResponse::data(todo).with_message("Todo created successfully"),
        ),
        Err(e) => errors::todo_error_to_response("create_todo", e),
    }
}

/// PATCH /api/todos/:id
pub async fn update_todo(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<String>,
    ValidJson(completed): ValidJson<UpdateTodoInput>,
) -> axum::response::Response {
    match services.todos.set_completed(&ctx.identity(), &id, completed).await {
        Ok(todo) => errors::json_ok(
            StatusCode::OK,
            ApiResponse::data(todo).with_message("Todo updated successfully"),
        ),
        Err(e) => errors::todo_error_to_response("update_todo", e),
    }
}

/// DELETE /api/todos/:id
pub async fn delete_todo(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match services.todos.delete(&ctx.identity(), &id).await {
        Ok(()) => errors::json_ok(StatusCode::OK, ApiResponse::message("Todo deleted successfully")),
        Err(e) => errors::todo_error_to_response("delete_todo", e),
    }
}
