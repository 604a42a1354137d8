//! AdminOnly gate.
//!
//! Runs after session resolution. Requests without a session are refused with
//! 403 as well, so the admin surface does not reveal whether a session is
//! missing or merely unprivileged.

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};

use tickbox_auth::{require_admin, require_identity};

use crate::app::errors;
use crate::context::SessionContext;

pub async fn admin_only(req: Request, next: Next) -> Response {
    let identity = req.extensions().get::<SessionContext>().map(SessionContext::identity);

    let allowed = require_identity(identity).and_then(|identity| require_admin(&identity));
    if let Err(e) = allowed {
        tracing::debug!(reason = %e, "admin gate rejected request");
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", "Forbidden");
    }
    next.run(req).await
}
