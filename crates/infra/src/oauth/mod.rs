//! OAuth 2.0 authorization-code clients for social sign-in.
//!
//! Each provider knows how to build its authorization URL and how to turn a
//! returned `code` into an [`OAuthProfile`]. Flow state (the `state` parameter)
//! is owned by the auth service, not by the providers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use tickbox_auth::{OAuthProfile, ProviderId};

pub mod github;
pub mod google;

pub use github::GithubProvider;
pub use google::GoogleProvider;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("network error: {0}")]
    Network(String),

    #[error("provider returned {0}: {1}")]
    Api(u16, String),

    #[error("unexpected provider response: {0}")]
    Parse(String),

    #[error("provider did not return an email address")]
    MissingEmail,

    #[error("invalid provider url: {0}")]
    Url(#[from] url::ParseError),
}

/// Client id/secret pair registered with a provider.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// URL the user agent is redirected to in order to grant access.
    fn authorization_url(&self, state: &str, redirect_uri: &str) -> Result<Url, OAuthError>;

    /// Exchange an authorization code and fetch the user's profile.
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<OAuthProfile, OAuthError>;
}

/// Enabled providers, keyed by id.
#[derive(Clone, Default)]
pub struct OAuthProviders {
    providers: HashMap<ProviderId, Arc<dyn OAuthProvider>>,
}

impl OAuthProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn OAuthProvider>) {
        self.providers.insert(provider.id(), provider);
    }

    pub fn with(mut self, provider: Arc<dyn OAuthProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, id: ProviderId) -> Option<Arc<dyn OAuthProvider>> {
        self.providers.get(&id).cloned()
    }

    pub fn enabled(&self) -> Vec<ProviderId> {
        let mut ids: Vec<ProviderId> = self.providers.keys().copied().collect();
        ids.sort_by_key(|id| id.as_str());
        ids
    }
}

impl std::fmt::Debug for OAuthProviders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthProviders")
            .field("enabled", &self.enabled())
            .finish()
    }
}

/// `application/x-www-form-urlencoded` body for token requests.
pub(crate) fn form_body(pairs: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().copied())
        .finish()
}

/// Fail on non-2xx, keeping the provider's body for the log.
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, OAuthError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(OAuthError::Api(status.as_u16(), body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_only_knows_registered_providers() {
        let providers = OAuthProviders::new()
            .with(Arc::new(GithubProvider::new(OAuthCredentials::new("id", "secret"))));

        assert!(providers.get(ProviderId::Github).is_some());
        assert!(providers.get(ProviderId::Google).is_none());
        assert_eq!(providers.enabled(), vec![ProviderId::Github]);
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let creds = OAuthCredentials::new("client", "hunter2");
        let printed = format!("{creds:?}");
        assert!(printed.contains("client"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn form_body_is_url_encoded() {
        let body = form_body(&[("code", "a b"), ("redirect_uri", "http://x/cb?y=1")]);
        assert_eq!(body, "code=a+b&redirect_uri=http%3A%2F%2Fx%2Fcb%3Fy%3D1");
    }
}
