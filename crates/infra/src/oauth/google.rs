use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use url::Url;

use tickbox_auth::{OAuthProfile, ProviderId};

use super::{OAuthCredentials, OAuthError, OAuthProvider, check_status, form_body};

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const SCOPES: &str = "openid email profile";

pub struct GoogleProvider {
    credentials: OAuthCredentials,
    client: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Google
    }

    fn authorization_url(&self, state: &str, redirect_uri: &str) -> Result<Url, OAuthError> {
        Ok(Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.credentials.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("state", state),
                ("prompt", "select_account"),
            ],
        )?)
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<OAuthProfile, OAuthError> {
        let body = form_body(&[
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ]);
        let resp = self
            .client
            .post(TOKEN_URL)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| OAuthError::Network(e.to_string()))?;
        let token: TokenResponse = check_status(resp)
            .await?
            .json()
            .await
            .map_err(|e| OAuthError::Parse(e.to_string()))?;

        let resp = self
            .client
            .get(USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| OAuthError::Network(e.to_string()))?;
        let info: UserInfo = check_status(resp)
            .await?
            .json()
            .await
            .map_err(|e| OAuthError::Parse(e.to_string()))?;

        into_profile(info, token.access_token)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

fn into_profile(info: UserInfo, access_token: String) -> Result<OAuthProfile, OAuthError> {
    let email = info.email.ok_or(OAuthError::MissingEmail)?;
    Ok(OAuthProfile {
        provider: ProviderId::Google,
        account_id: info.sub,
        email,
        email_verified: info.email_verified,
        name: info.name.unwrap_or_default(),
        image: info.picture,
        access_token: Some(access_token),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_url_requests_code_flow() {
        let provider = GoogleProvider::new(OAuthCredentials::new("gid", "gsecret"));
        let url = provider.authorization_url("xyz", "http://localhost/cb").unwrap();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(params.contains(&("response_type".into(), "code".into())));
        assert!(params.contains(&("state".into(), "xyz".into())));
    }

    #[test]
    fn userinfo_maps_to_profile() {
        let info: UserInfo = serde_json::from_str(
            r#"{"sub":"1099","email":"ada@example.com","email_verified":true,"name":"Ada","picture":"http://img"}"#,
        )
        .unwrap();
        let profile = into_profile(info, "tok".into()).unwrap();

        assert_eq!(profile.account_id, "1099");
        assert!(profile.email_verified);
        assert_eq!(profile.image.as_deref(), Some("http://img"));
    }

    #[test]
    fn userinfo_without_email_is_rejected() {
        let info: UserInfo = serde_json::from_str(r#"{"sub":"1"}"#).unwrap();
        assert!(matches!(into_profile(info, "tok".into()), Err(OAuthError::MissingEmail)));
    }
}
