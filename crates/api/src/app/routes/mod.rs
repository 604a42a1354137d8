use axum::Router;

pub mod admin;
pub mod auth;
pub mod system;
pub mod todos;

/// Router for every `/api` endpoint. Each group attaches its own gate.
pub fn router() -> Router {
    Router::new()
        .merge(auth::router())
        .merge(todos::router())
        .merge(admin::router())
}
