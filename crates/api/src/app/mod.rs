//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store backend selection and service construction
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and their validation
//! - `extract.rs`: the validating JSON extractor
//! - `errors.rs`: response envelope and error mapping

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::config::AppConfig;
use crate::middleware;

pub use services::AppServices;

pub mod dto;
pub mod errors;
pub mod extract;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
///
/// Also starts the background purge of expired sessions and OAuth states.
pub async fn build_app(config: AppConfig) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(config).await?);
    services::spawn_auth_purge(services.clone(), services::PURGE_INTERVAL);
    Ok(router(services))
}

/// Router over already-built services.
///
/// Request pipeline: resolve session → gate (per route group) → validate body
/// → handler → envelope.
pub fn router(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(
            ServiceBuilder::new()
                .layer(Extension(services.clone()))
                .layer(axum::middleware::from_fn_with_state(services, middleware::resolve_session)),
        )
}
