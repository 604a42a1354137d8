//! Authentication endpoints.
//!
//! Sessions are delivered both as an HttpOnly cookie and in the JSON body
//! (for bearer-token clients).

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;

use tickbox_auth::SignUpInput;
use tickbox_infra::services::IssuedSession;

use crate::app::dto::{AuthPayload, ChangePasswordRequest, SessionPayload, SignInRequest, SocialCallbackParams};
use crate::app::errors::{self, ApiResponse};
use crate::app::extract::ValidJson;
use crate::app::services::AppServices;
use crate::context::SessionContext;
use crate::cookie::{clear_session_cookie, session_cookie};
use crate::middleware::{self, client_info, extract_session_token};

pub fn router() -> Router {
    let protected = Router::new()
        .route("/api/auth/change-password", post(change_password))
        .route_layer(axum::middleware::from_fn(middleware::auth_only));

    Router::new()
        .route("/api/auth/sign-up/email", post(sign_up))
        .route("/api/auth/sign-in/email", post(sign_in))
        .route("/api/auth/sign-out", post(sign_out))
        .route("/api/auth/get-session", get(get_session))
        .route("/api/auth/sign-in/social/:provider", get(begin_social))
        .route("/api/auth/callback/:provider", get(social_callback))
        .merge(protected)
}

// ─────────────────────────────────────────────────────────────────────────────
// Email + password
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/auth/sign-up/email
pub async fn sign_up(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    jar: CookieJar,
    ValidJson(input): ValidJson<SignUpInput>,
) -> Response {
    match services.auth.sign_up(&input, client_info(&headers)).await {
        Ok(issued) => session_response(jar, &services, issued, true),
        Err(e) => errors::auth_error_to_response("sign_up", e),
    }
}

/// POST /api/auth/sign-in/email
pub async fn sign_in(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    jar: CookieJar,
    ValidJson(req): ValidJson<SignInRequest>,
) -> Response {
    match services
        .auth
        .sign_in(&req.email, &req.password, client_info(&headers))
        .await
    {
        Ok(issued) => session_response(jar, &services, issued, req.remember_me),
        Err(e) => errors::auth_error_to_response("sign_in", e),
    }
}

/// POST /api/auth/sign-out - Always succeeds; the cookie is cleared either way.
pub async fn sign_out(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    let token = extract_session_token(&headers);
    if let Err(e) = services.auth.sign_out(token.as_ref()).await {
        tracing::warn!(error = %e, "sign-out could not revoke session");
    }
    (
        StatusCode::OK,
        jar.add(clear_session_cookie(services.config.cookie_secure)),
        Json(ApiResponse::message("Signed out")),
    )
        .into_response()
}

/// GET /api/auth/get-session - `{session, user}` or `null`.
pub async fn get_session(ctx: Option<Extension<SessionContext>>) -> Response {
    match ctx {
        Some(Extension(ctx)) => Json(SessionPayload {
            session: ctx.session(),
            user: ctx.user(),
        })
        .into_response(),
        None => Json(serde_json::Value::Null).into_response(),
    }
}

/// POST /api/auth/change-password
pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    ValidJson(req): ValidJson<ChangePasswordRequest>,
) -> Response {
    match services
        .auth
        .change_password(
            ctx.resolved(),
            &req.current_password,
            &req.new_password,
            req.revoke_other_sessions,
        )
        .await
    {
        Ok(()) => errors::json_ok(StatusCode::OK, ApiResponse::message("Password changed")),
        Err(e) => errors::auth_error_to_response("change_password", e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Social
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/auth/sign-in/social/:provider - Redirect to the provider.
pub async fn begin_social(Extension(services): Extension<Arc<AppServices>>, Path(provider): Path<String>) -> Response {
    let redirect_uri = services.config.oauth_redirect_uri(&provider);
    match services.auth.begin_social(&provider, &redirect_uri).await {
        Ok(url) => found(url.as_str()),
        Err(e) => errors::auth_error_to_response("begin_social", e),
    }
}

/// GET /api/auth/callback/:provider - Finish sign-in and redirect into the app.
pub async fn social_callback(
    Extension(services): Extension<Arc<AppServices>>,
    Path(provider): Path<String>,
    Query(params): Query<SocialCallbackParams>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    if !services.auth.provider_enabled(&provider) {
        return errors::json_error(
            StatusCode::NOT_FOUND,
            "provider_not_found",
            format!("provider '{provider}' is not enabled"),
        );
    }
    if let Some(error) = params.error {
        tracing::info!(provider = %provider, error = %error, "provider denied sign-in");
        return errors::json_error(StatusCode::BAD_REQUEST, "oauth_denied", error);
    }
    let (Some(code), Some(state)) = (params.code, params.state) else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_state", "missing code or state");
    };

    let redirect_uri = services.config.oauth_redirect_uri(&provider);
    match services
        .auth
        .complete_social(&provider, &code, &state, &redirect_uri, client_info(&headers))
        .await
    {
        Ok(issued) => {
            let cookie = session_cookie(
                &issued.token,
                services.config.cookie_secure,
                Some(services.config.session_ttl),
            );
            (jar.add(cookie), found(&services.config.post_login_redirect)).into_response()
        }
        Err(e) => errors::auth_error_to_response("social_callback", e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// 200 with the session cookie and `{token, user}`.
fn session_response(jar: CookieJar, services: &AppServices, issued: IssuedSession, remember: bool) -> Response {
    let max_age = remember.then_some(services.config.session_ttl);
    let cookie = session_cookie(&issued.token, services.config.cookie_secure, max_age);
    let payload = AuthPayload {
        token: issued.token.as_str().to_string(),
        user: issued.user,
    };
    (StatusCode::OK, jar.add(cookie), Json(ApiResponse::data(payload))).into_response()
}

/// 302 Found.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
