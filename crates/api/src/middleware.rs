//! Session resolution and the AuthOnly gate.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};

use axum_extra::extract::cookie::CookieJar;

use tickbox_auth::SessionToken;
use tickbox_infra::services::ClientInfo;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::SessionContext;
use crate::cookie;

/// Resolve the request's credential into a [`SessionContext`], if any.
///
/// Never rejects: requests without a valid session pass through without a
/// context, and the gates decide what that means.
pub async fn resolve_session(
    State(services): State<Arc<AppServices>>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(req.headers()) {
        if let Some(resolved) = services.auth.resolve_session(&token).await {
            req.extensions_mut().insert(SessionContext::new(resolved));
        }
    }
    next.run(req).await
}

/// AuthOnly: 401 unless a session was resolved.
pub async fn auth_only(req: Request, next: Next) -> Response {
    if req.extensions().get::<SessionContext>().is_none() {
        return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized");
    }
    next.run(req).await
}

/// Session cookie first, then `Authorization: Bearer`.
pub fn extract_session_token(headers: &HeaderMap) -> Option<SessionToken> {
    cookie::session_token(&CookieJar::from_headers(headers))
        .or_else(|| extract_bearer(headers).map(SessionToken::from_raw))
}

pub fn client_info(headers: &HeaderMap) -> ClientInfo {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    ClientInfo {
        ip_address: header_str("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(|ip| ip.trim().to_string()),
        user_agent: header_str(header::USER_AGENT.as_str()).map(str::to_string),
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}
