//! Process configuration, read once at startup and passed into `build_app`.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use tickbox_infra::oauth::OAuthCredentials;
use tickbox_observability::LogFormat;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;
/// One year. Keeps `now + ttl` far inside the representable date range.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 366;
pub const DEFAULT_POST_LOGIN_REDIRECT: &str = "/dashboard";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Public origin of this service; OAuth callback URLs are built from it.
    pub base_url: String,
    /// Postgres connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub session_ttl: Duration,
    pub cookie_secure: bool,
    pub post_login_redirect: String,
    pub github: Option<OAuthCredentials>,
    pub google: Option<OAuthCredentials>,
    /// Users created with one of these emails start as admins.
    pub admin_emails: Vec<String>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Read configuration from the environment, applying defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Deterministic in-memory configuration for tests.
    pub fn for_tests() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            base_url: DEFAULT_BASE_URL.to_string(),
            database_url: None,
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            cookie_secure: false,
            post_login_redirect: DEFAULT_POST_LOGIN_REDIRECT.to_string(),
            github: None,
            google: None,
            admin_emails: vec!["admin@example.com".to_string()],
            log_format: LogFormat::Pretty,
        }
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| get(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| invalid("BIND_ADDR", e))?;

        let base_url = var("BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let session_ttl_hours = match var("SESSION_TTL_HOURS") {
            Some(raw) => raw.parse::<i64>().map_err(|e| invalid("SESSION_TTL_HOURS", e))?,
            None => DEFAULT_SESSION_TTL_HOURS,
        };
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&session_ttl_hours) {
            return Err(invalid(
                "SESSION_TTL_HOURS",
                format!("must be between 1 and {MAX_SESSION_TTL_HOURS}"),
            ));
        }

        let cookie_secure = match var("COOKIE_SECURE") {
            Some(raw) => raw.parse::<bool>().map_err(|e| invalid("COOKIE_SECURE", e))?,
            None => false,
        };

        let log_format = match var("LOG_FORMAT") {
            Some(raw) => raw.parse::<LogFormat>().map_err(|e| invalid("LOG_FORMAT", e))?,
            None => LogFormat::Json,
        };

        let provider = |id: &str, secret: &str| match (var(id), var(secret)) {
            (Some(id), Some(secret)) => Some(OAuthCredentials::new(id, secret)),
            _ => None,
        };

        let admin_emails = var("ADMIN_EMAILS")
            .map(|raw| {
                raw.split(',')
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_addr,
            base_url,
            database_url: var("DATABASE_URL"),
            session_ttl: Duration::hours(session_ttl_hours),
            cookie_secure,
            post_login_redirect: var("POST_LOGIN_REDIRECT")
                .unwrap_or_else(|| DEFAULT_POST_LOGIN_REDIRECT.to_string()),
            github: provider("GITHUB_CLIENT_ID", "GITHUB_CLIENT_SECRET"),
            google: provider("GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"),
            admin_emails,
            log_format,
        })
    }

    /// Log settings that are fine for development but not for production.
    pub fn warn_insecure_defaults(&self) {
        if self.database_url.is_none() {
            tracing::warn!("DATABASE_URL not set; using in-memory store (data is lost on restart)");
        }
        if !self.cookie_secure {
            tracing::warn!("COOKIE_SECURE is false; session cookies will be sent over plain HTTP");
        }
    }

    /// Callback URL registered with `provider`.
    pub fn oauth_redirect_uri(&self, provider: &str) -> String {
        format!("{}/api/auth/callback/{}", self.base_url, provider)
    }
}

fn invalid(name: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.to_string(),
    }
}
