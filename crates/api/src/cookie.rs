//! The session cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Duration;

use tickbox_auth::SessionToken;

pub const SESSION_COOKIE: &str = "tickbox.session_token";

/// Cookie carrying `token`. With `max_age` it survives browser restarts;
/// without it, it is a browser-session cookie.
pub fn session_cookie(token: &SessionToken, secure: bool, max_age: Option<Duration>) -> Cookie<'static> {
    let mut cookie = base_cookie(token.as_str().to_string(), secure);
    if let Some(max_age) = max_age {
        cookie.set_max_age(time::Duration::seconds(max_age.num_seconds().max(0)));
    }
    cookie
}

/// Expire the session cookie immediately.
pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = base_cookie(String::new(), secure);
    cookie.make_removal();
    cookie
}

/// Session token presented in the request cookies, if any.
pub fn session_token(jar: &CookieJar) -> Option<SessionToken> {
    jar.get(SESSION_COOKIE)
        .map(|c| c.value_trimmed())
        .filter(|v| !v.is_empty())
        .map(SessionToken::from_raw)
}

fn base_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}
