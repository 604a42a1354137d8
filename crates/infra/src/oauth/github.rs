use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde::Deserialize;
use url::Url;

use tickbox_auth::{OAuthProfile, ProviderId};

use super::{OAuthCredentials, OAuthError, OAuthProvider, check_status, form_body};

const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const API_URL: &str = "https://api.github.com";
const SCOPES: &str = "read:user user:email";

pub struct GithubProvider {
    credentials: OAuthCredentials,
    client: reqwest::Client,
}

impl GithubProvider {
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            client: reqwest::Client::new(),
        }
    }

    async fn access_token(&self, code: &str, redirect_uri: &str) -> Result<String, OAuthError> {
        let body = form_body(&[
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ]);
        let resp = self
            .client
            .post(TOKEN_URL)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| OAuthError::Network(e.to_string()))?;

        // GitHub reports a bad code as 200 with an `error` field.
        let token: TokenResponse = check_status(resp)
            .await?
            .json()
            .await
            .map_err(|e| OAuthError::Parse(e.to_string()))?;
        match (token.access_token, token.error) {
            (Some(t), _) => Ok(t),
            (None, Some(err)) => Err(OAuthError::Api(400, err)),
            (None, None) => Err(OAuthError::Parse("token response without access_token".into())),
        }
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str, token: &str) -> Result<T, OAuthError> {
        let resp = self
            .client
            .get(format!("{API_URL}{path}"))
            .bearer_auth(token)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, "tickbox")
            .send()
            .await
            .map_err(|e| OAuthError::Network(e.to_string()))?;
        check_status(resp)
            .await?
            .json()
            .await
            .map_err(|e| OAuthError::Parse(e.to_string()))
    }
}

#[async_trait]
impl OAuthProvider for GithubProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Github
    }

    fn authorization_url(&self, state: &str, redirect_uri: &str) -> Result<Url, OAuthError> {
        Ok(Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.credentials.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", SCOPES),
                ("state", state),
            ],
        )?)
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<OAuthProfile, OAuthError> {
        let token = self.access_token(code, redirect_uri).await?;
        let user: GithubUser = self.get("/user", &token).await?;

        // The public profile email may be hidden; fall back to the primary address.
        let emails: Vec<GithubEmail> = self.get("/user/emails", &token).await.unwrap_or_default();
        let (email, email_verified) = pick_email(user.email.as_deref(), &emails).ok_or(OAuthError::MissingEmail)?;

        Ok(OAuthProfile {
            provider: ProviderId::Github,
            account_id: user.id.to_string(),
            email,
            email_verified,
            name: user.name.unwrap_or(user.login),
            image: user.avatar_url,
            access_token: Some(token),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: u64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

fn pick_email(profile_email: Option<&str>, emails: &[GithubEmail]) -> Option<(String, bool)> {
    if let Some(primary) = emails.iter().find(|e| e.primary) {
        return Some((primary.email.clone(), primary.verified));
    }
    let email = profile_email?;
    let verified = emails.iter().any(|e| e.email == email && e.verified);
    Some((email.to_string(), verified))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(address: &str, primary: bool, verified: bool) -> GithubEmail {
        GithubEmail {
            email: address.to_string(),
            primary,
            verified,
        }
    }

    #[test]
    fn authorization_url_carries_state_and_redirect() {
        let provider = GithubProvider::new(OAuthCredentials::new("abc", "shh"));
        let url = provider
            .authorization_url("st4te", "http://localhost:8080/api/auth/callback/github")
            .unwrap();

        let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(params.contains(&("client_id".into(), "abc".into())));
        assert!(params.contains(&("state".into(), "st4te".into())));
        assert!(params.contains(&(
            "redirect_uri".into(),
            "http://localhost:8080/api/auth/callback/github".into()
        )));
        assert!(!url.as_str().contains("shh"));
    }

    #[test]
    fn primary_email_wins_over_profile_email() {
        let emails = vec![email("old@example.com", false, true), email("main@example.com", true, true)];
        assert_eq!(
            pick_email(Some("old@example.com"), &emails),
            Some(("main@example.com".to_string(), true))
        );
    }

    #[test]
    fn falls_back_to_profile_email() {
        assert_eq!(
            pick_email(Some("octo@example.com"), &[]),
            Some(("octo@example.com".to_string(), false))
        );
        assert_eq!(pick_email(None, &[]), None);
    }
}
