//! Authentication use cases: credential sign-up/sign-in, session lifecycle,
//! password change, and OAuth sign-in with account linking.
//!
//! Raw session tokens only exist in [`IssuedSession`]; everything persisted is
//! keyed by the token hash.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use tickbox_auth::{
    Account, Identity, OAuthProfile, ProviderId, Role, Session, SessionToken, SignUpInput, User,
    hash_password, normalize_email, validate_password, validate_session, verify_dummy_password,
    verify_password,
};
use tickbox_core::DomainError;

use crate::oauth::{OAuthError, OAuthProviders};
use crate::store::{SessionStore, StoreError, UserStore, Verification, VerificationStore};

/// OAuth `state` entries expire after this long.
pub const OAUTH_STATE_TTL_MINUTES: i64 = 10;

const OAUTH_STATE_PREFIX: &str = "oauth-state:";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("User already exists. Use another email.")]
    UserAlreadyExists,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("You have been banned from this application")]
    Banned,

    #[error("provider '{0}' is not enabled")]
    UnknownProvider(String),

    #[error("invalid or expired OAuth state")]
    InvalidState,

    #[error(transparent)]
    OAuth(#[from] OAuthError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DomainError> for AuthError {
    fn from(value: DomainError) -> Self {
        AuthError::Validation(value.to_string())
    }
}

/// Request metadata recorded on new sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// A freshly created session, including the raw token for the client.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: SessionToken,
    pub session: Session,
    pub user: User,
}

/// A validated session and the user behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub session: Session,
    pub user: User,
}

impl ResolvedSession {
    pub fn identity(&self) -> Identity {
        self.user.identity()
    }
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    verifications: Arc<dyn VerificationStore>,
    providers: OAuthProviders,
    session_ttl: Duration,
    admin_emails: Vec<String>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        verifications: Arc<dyn VerificationStore>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            verifications,
            providers: OAuthProviders::new(),
            session_ttl,
            admin_emails: Vec::new(),
        }
    }

    pub fn with_providers(mut self, providers: OAuthProviders) -> Self {
        self.providers = providers;
        self
    }

    /// Emails that are granted the admin role when their user is created.
    pub fn with_admin_emails<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.admin_emails = emails.into_iter().map(|e| normalize_email(e.as_ref())).collect();
        self
    }

    /// Whether social sign-in through `provider` is configured.
    pub fn provider_enabled(&self, provider: &str) -> bool {
        self.enabled_provider(provider)
            .is_ok_and(|id| self.providers.get(id).is_some())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Credentials
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn sign_up(&self, input: &SignUpInput, client: ClientInfo) -> Result<IssuedSession, AuthError> {
        input.validate()?;
        let now = Utc::now();

        let mut user = User::register(&input.name, &input.email, now)?;
        self.apply_bootstrap_role(&mut user);
        let password_hash = hash_password(&input.password).map_err(|e| AuthError::Internal(e.to_string()))?;

        self.create_user(&user, Account::credential(user.id, password_hash, now))
            .await?;

        tracing::info!(user_id = %user.id, "user signed up");
        self.issue_session(user, client, now).await
    }

    pub async fn sign_in(&self, email: &str, password: &str, client: ClientInfo) -> Result<IssuedSession, AuthError> {
        let email = normalize_email(email);
        let Some(user) = self.users.find_user_by_email(&email).await? else {
            verify_dummy_password(password);
            return Err(AuthError::InvalidCredentials);
        };
        let account = self.users.find_credential_account(user.id).await?;

        let Some(hash) = account.as_ref().and_then(|a| a.password_hash.as_deref()) else {
            verify_dummy_password(password);
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, hash) {
            tracing::info!(user_id = %user.id, "sign-in rejected: bad password");
            return Err(AuthError::InvalidCredentials);
        }
        if user.banned {
            tracing::info!(user_id = %user.id, "sign-in rejected: user is banned");
            return Err(AuthError::Banned);
        }

        self.issue_session(user, client, Utc::now()).await
    }

    /// Revoke the presented session, if any. Returns whether one was removed.
    pub async fn sign_out(&self, token: Option<&SessionToken>) -> Result<bool, AuthError> {
        match token {
            Some(token) => Ok(self.sessions.revoke_session(&token.hash()).await?),
            None => Ok(false),
        }
    }

    /// Resolve a presented token into a live session.
    ///
    /// Read-only. Never fails: store errors are logged and treated as "no
    /// session". Expired rows are left for [`AuthService::purge_expired`].
    pub async fn resolve_session(&self, token: &SessionToken) -> Option<ResolvedSession> {
        match self.try_resolve(token, Utc::now()).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(error = %e, "session lookup failed");
                None
            }
        }
    }

    async fn try_resolve(&self, token: &SessionToken, now: DateTime<Utc>) -> Result<Option<ResolvedSession>, StoreError> {
        let Some(session) = self.sessions.find_session(&token.hash()).await? else {
            return Ok(None);
        };
        if let Err(e) = validate_session(&session, now) {
            tracing::debug!(session_id = %session.id, reason = %e, "session rejected");
            return Ok(None);
        }
        let Some(user) = self.users.get_user(session.user_id).await? else {
            return Ok(None);
        };
        if user.banned {
            return Ok(None);
        }
        Ok(Some(ResolvedSession { session, user }))
    }

    /// Replace the credential password of the session's user.
    ///
    /// With `revoke_other_sessions`, every session except the current one is revoked.
    pub async fn change_password(
        &self,
        current: &ResolvedSession,
        current_password: &str,
        new_password: &str,
        revoke_other_sessions: bool,
    ) -> Result<(), AuthError> {
        validate_password(new_password).map_err(|e| AuthError::Validation(e.to_string()))?;

        let user_id = current.user.id;
        let mut account = self
            .users
            .find_credential_account(user_id)
            .await?
            .ok_or_else(|| AuthError::Validation("Credential account not found".to_string()))?;

        let verified = account
            .password_hash
            .as_deref()
            .is_some_and(|hash| verify_password(current_password, hash));
        if !verified {
            return Err(AuthError::InvalidPassword);
        }

        account.password_hash = Some(hash_password(new_password).map_err(|e| AuthError::Internal(e.to_string()))?);
        account.updated_at = Utc::now();
        self.users.update_account(&account).await?;

        if revoke_other_sessions {
            let revoked = self
                .sessions
                .revoke_user_sessions(user_id, Some(current.session.id))
                .await?;
            tracing::info!(user_id = %user_id, revoked, "other sessions revoked after password change");
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Social sign-in
    // ─────────────────────────────────────────────────────────────────────────

    /// Start an OAuth flow: store a fresh `state` and return the provider URL.
    pub async fn begin_social(&self, provider: &str, redirect_uri: &str) -> Result<Url, AuthError> {
        let provider_id = self.enabled_provider(provider)?;
        let Some(client) = self.providers.get(provider_id) else {
            return Err(AuthError::UnknownProvider(provider.to_string()));
        };

        let now = Utc::now();
        let purged = self.verifications.purge_expired_verifications(now).await?;
        if purged > 0 {
            tracing::debug!(purged, "expired oauth states purged");
        }

        let state = Uuid::new_v4().simple().to_string();
        self.verifications
            .insert_verification(&Verification {
                id: Uuid::now_v7(),
                identifier: format!("{OAUTH_STATE_PREFIX}{state}"),
                value: provider_id.as_str().to_string(),
                expires_at: now + Duration::minutes(OAUTH_STATE_TTL_MINUTES),
                created_at: now,
            })
            .await?;

        Ok(client.authorization_url(&state, redirect_uri)?)
    }

    /// Finish an OAuth flow: consume `state`, exchange `code`, find or create the user.
    pub async fn complete_social(
        &self,
        provider: &str,
        code: &str,
        state: &str,
        redirect_uri: &str,
        client: ClientInfo,
    ) -> Result<IssuedSession, AuthError> {
        let provider_id = self.enabled_provider(provider)?;
        let Some(oauth) = self.providers.get(provider_id) else {
            return Err(AuthError::UnknownProvider(provider.to_string()));
        };

        let now = Utc::now();
        let stored = self
            .verifications
            .take_verification(&format!("{OAUTH_STATE_PREFIX}{state}"), now)
            .await?
            .ok_or(AuthError::InvalidState)?;
        if stored.value != provider_id.as_str() {
            return Err(AuthError::InvalidState);
        }

        let profile = oauth.exchange_code(code, redirect_uri).await?;
        let user = self.user_for_profile(&profile, now).await?;
        if user.banned {
            return Err(AuthError::Banned);
        }
        self.issue_session(user, client, now).await
    }

    /// Existing provider account, else link by verified email, else create.
    async fn user_for_profile(&self, profile: &OAuthProfile, now: DateTime<Utc>) -> Result<User, AuthError> {
        if let Some(mut account) = self.users.find_account(profile.provider, &profile.account_id).await? {
            let user = self
                .users
                .get_user(account.user_id)
                .await?
                .ok_or_else(|| StoreError::Corrupt(format!("account {} has no user", account.id)))?;
            if profile.access_token.is_some() && account.access_token != profile.access_token {
                account.access_token = profile.access_token.clone();
                account.updated_at = now;
                self.users.update_account(&account).await?;
            }
            return Ok(user);
        }

        let email = normalize_email(&profile.email);
        if let Some(mut user) = self.users.find_user_by_email(&email).await? {
            if !profile.email_verified {
                tracing::warn!(provider = %profile.provider, "refusing to link account with unverified email");
                return Err(AuthError::UserAlreadyExists);
            }
            self.users.insert_account(&Account::oauth(user.id, profile, now)).await?;
            if !user.email_verified {
                user.email_verified = true;
                user.updated_at = now;
                self.users.update_user(&user).await?;
            }
            tracing::info!(user_id = %user.id, provider = %profile.provider, "linked social account");
            return Ok(user);
        }

        let mut user = profile.to_user(now)?;
        self.apply_bootstrap_role(&mut user);
        self.create_user(&user, Account::oauth(user.id, profile, now)).await?;
        tracing::info!(user_id = %user.id, provider = %profile.provider, "user signed up via social login");
        Ok(user)
    }

    fn enabled_provider(&self, provider: &str) -> Result<ProviderId, AuthError> {
        match provider.parse::<ProviderId>() {
            Ok(ProviderId::Credential) | Err(_) => Err(AuthError::UnknownProvider(provider.to_string())),
            Ok(id) => Ok(id),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Delete sessions and OAuth states that expired at or before `now`.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<(u64, u64), AuthError> {
        let sessions = self.sessions.purge_expired_sessions(now).await?;
        let verifications = self.verifications.purge_expired_verifications(now).await?;
        tracing::info!(sessions, verifications, "expired auth rows purged");
        Ok((sessions, verifications))
    }

    /// Insert a user and its first account. If the account cannot be stored
    /// the user row is removed again, so the email stays free for a retry.
    async fn create_user(&self, user: &User, account: Account) -> Result<(), AuthError> {
        self.users.insert_user(user).await.map_err(|e| match e {
            StoreError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Store(other),
        })?;
        if let Err(e) = self.users.insert_account(&account).await {
            if let Err(undo) = self.users.delete_user(user.id).await {
                tracing::error!(user_id = %user.id, error = %undo, "could not remove user after failed account insert");
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn apply_bootstrap_role(&self, user: &mut User) {
        if self.admin_emails.iter().any(|e| *e == user.email) {
            user.role = Role::Admin;
        }
    }

    async fn issue_session(&self, user: User, client: ClientInfo, now: DateTime<Utc>) -> Result<IssuedSession, AuthError> {
        let token = SessionToken::generate();
        let session =
            Session::start(user.id, &token, self.session_ttl, now).with_client(client.ip_address, client.user_agent);
        self.sessions.insert_session(&session).await?;
        tracing::debug!(user_id = %user.id, session_id = %session.id, "session issued");
        Ok(IssuedSession { token, session, user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::oauth::OAuthProvider;
    use crate::store::InMemoryStore;

    const PASSWORD: &str = "Corr3ct-horse";

    struct FakeGithub {
        profile: OAuthProfile,
    }

    #[async_trait]
    impl OAuthProvider for FakeGithub {
        fn id(&self) -> ProviderId {
            ProviderId::Github
        }

        fn authorization_url(&self, state: &str, redirect_uri: &str) -> Result<Url, OAuthError> {
            Ok(Url::parse_with_params(
                "https://provider.test/authorize",
                &[("state", state), ("redirect_uri", redirect_uri)],
            )?)
        }

        async fn exchange_code(&self, code: &str, _redirect_uri: &str) -> Result<OAuthProfile, OAuthError> {
            if code == "good-code" {
                Ok(self.profile.clone())
            } else {
                Err(OAuthError::Api(400, "bad_verification_code".into()))
            }
        }
    }

    fn github_profile(email: &str, verified: bool) -> OAuthProfile {
        OAuthProfile {
            provider: ProviderId::Github,
            account_id: "gh-1".into(),
            email: email.into(),
            email_verified: verified,
            name: "Octo Cat".into(),
            image: None,
            access_token: Some("gho_token".into()),
        }
    }

    fn service_with(store: Arc<InMemoryStore>, profile: OAuthProfile) -> AuthService {
        AuthService::new(store.clone(), store.clone(), store, Duration::hours(1))
            .with_providers(OAuthProviders::new().with(Arc::new(FakeGithub { profile })))
            .with_admin_emails(["Boss@Example.com"])
    }

    fn service() -> (AuthService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (service_with(store.clone(), github_profile("octo@example.com", true)), store)
    }

    fn sign_up_input(email: &str) -> SignUpInput {
        SignUpInput {
            name: "Alice".into(),
            email: email.into(),
            password: PASSWORD.into(),
        }
    }

    fn state_from(url: &Url) -> String {
        url.query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[tokio::test]
    async fn sign_up_then_sign_in_resolves_sessions() {
        let (svc, _) = service();
        let issued = svc.sign_up(&sign_up_input("alice@example.com"), ClientInfo::default()).await.unwrap();
        assert_eq!(issued.user.role, Role::User);

        let resolved = svc.resolve_session(&issued.token).await.unwrap();
        assert_eq!(resolved.user.id, issued.user.id);

        let again = svc.sign_in(" ALICE@example.com ", PASSWORD, ClientInfo::default()).await.unwrap();
        assert_ne!(again.token, issued.token);
        assert!(svc.resolve_session(&again.token).await.is_some());
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_rejected() {
        let (svc, _) = service();
        svc.sign_up(&sign_up_input("dup@example.com"), ClientInfo::default()).await.unwrap();
        let err = svc
            .sign_up(&sign_up_input("DUP@example.com"), ClientInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn bad_credentials_are_indistinguishable() {
        let (svc, _) = service();
        svc.sign_up(&sign_up_input("bob@example.com"), ClientInfo::default()).await.unwrap();

        let wrong_password = svc.sign_in("bob@example.com", "Nope-nope1", ClientInfo::default()).await;
        let unknown_user = svc.sign_in("nobody@example.com", PASSWORD, ClientInfo::default()).await;
        assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown_user, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn banned_users_cannot_sign_in_or_resolve() {
        let (svc, store) = service();
        let issued = svc.sign_up(&sign_up_input("carol@example.com"), ClientInfo::default()).await.unwrap();

        let mut user = issued.user.clone();
        user.banned = true;
        store.update_user(&user).await.unwrap();

        assert!(svc.resolve_session(&issued.token).await.is_none());
        let err = svc.sign_in("carol@example.com", PASSWORD, ClientInfo::default()).await.unwrap_err();
        assert!(matches!(err, AuthError::Banned));
    }

    #[tokio::test]
    async fn expired_sessions_do_not_resolve_and_are_purged_separately() {
        let (svc, store) = service();
        let issued = svc.sign_up(&sign_up_input("dave@example.com"), ClientInfo::default()).await.unwrap();

        let now = Utc::now();
        let token = SessionToken::generate();
        let stale = Session::start(issued.user.id, &token, Duration::minutes(5), now - Duration::hours(1));
        store.insert_session(&stale).await.unwrap();

        assert!(svc.resolve_session(&token).await.is_none());
        // Resolution never writes.
        assert!(store.find_session(&stale.token_hash).await.unwrap().is_some());

        let (sessions, _) = svc.purge_expired(now).await.unwrap();
        assert_eq!(sessions, 1);
        assert!(store.find_session(&stale.token_hash).await.unwrap().is_none());
        assert!(svc.resolve_session(&issued.token).await.is_some());
    }

    #[tokio::test]
    async fn sessions_from_a_clock_ahead_still_resolve() {
        let (svc, store) = service();
        let issued = svc.sign_up(&sign_up_input("skew@example.com"), ClientInfo::default()).await.unwrap();

        let token = SessionToken::generate();
        let ahead = Session::start(issued.user.id, &token, Duration::hours(1), Utc::now() + Duration::seconds(2));
        store.insert_session(&ahead).await.unwrap();

        assert!(svc.resolve_session(&token).await.is_some());
        assert!(store.find_session(&ahead.token_hash).await.unwrap().is_some());
        assert!(svc.resolve_session(&token).await.is_some());
    }

    #[tokio::test]
    async fn begin_social_purges_expired_states() {
        let (svc, store) = service();
        let now = Utc::now();
        for i in 0..50 {
            store
                .insert_verification(&Verification {
                    id: Uuid::now_v7(),
                    identifier: format!("{OAUTH_STATE_PREFIX}abandoned-{i}"),
                    value: "github".into(),
                    expires_at: now - Duration::minutes(1),
                    created_at: now - Duration::minutes(11),
                })
                .await
                .unwrap();
        }

        svc.begin_social("github", "http://cb").await.unwrap();

        // Only the state just issued is left.
        let remaining = store.purge_expired_verifications(now + Duration::days(1)).await.unwrap();
        assert_eq!(remaining, 1);
    }

    /// Delegates to the in-memory store but refuses to store accounts.
    struct AccountInsertFails(Arc<InMemoryStore>);

    #[async_trait]
    impl UserStore for AccountInsertFails {
        async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
            self.0.insert_user(user).await
        }
        async fn get_user(&self, id: tickbox_core::UserId) -> Result<Option<User>, StoreError> {
            self.0.get_user(id).await
        }
        async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            self.0.find_user_by_email(email).await
        }
        async fn list_users(&self) -> Result<Vec<User>, StoreError> {
            self.0.list_users().await
        }
        async fn update_user(&self, user: &User) -> Result<bool, StoreError> {
            self.0.update_user(user).await
        }
        async fn delete_user(&self, id: tickbox_core::UserId) -> Result<bool, StoreError> {
            self.0.delete_user(id).await
        }
        async fn insert_account(&self, _account: &Account) -> Result<(), StoreError> {
            Err(StoreError::Backend("connection reset".into()))
        }
        async fn find_account(&self, provider: ProviderId, account_id: &str) -> Result<Option<Account>, StoreError> {
            self.0.find_account(provider, account_id).await
        }
        async fn find_credential_account(&self, user_id: tickbox_core::UserId) -> Result<Option<Account>, StoreError> {
            self.0.find_credential_account(user_id).await
        }
        async fn update_account(&self, account: &Account) -> Result<(), StoreError> {
            self.0.update_account(account).await
        }
    }

    #[tokio::test]
    async fn failed_account_insert_leaves_email_free() {
        let store = Arc::new(InMemoryStore::new());
        let broken = AuthService::new(
            Arc::new(AccountInsertFails(store.clone())),
            store.clone(),
            store.clone(),
            Duration::hours(1),
        );

        let err = broken
            .sign_up(&sign_up_input("retry@example.com"), ClientInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Store(StoreError::Backend(_))));
        assert!(store.find_user_by_email("retry@example.com").await.unwrap().is_none());

        let svc = AuthService::new(store.clone(), store.clone(), store, Duration::hours(1));
        let issued = svc.sign_up(&sign_up_input("retry@example.com"), ClientInfo::default()).await.unwrap();
        assert!(svc.sign_in("retry@example.com", PASSWORD, ClientInfo::default()).await.is_ok());
        assert_eq!(issued.user.email, "retry@example.com");
    }

    #[tokio::test]
    async fn sign_out_revokes_only_the_presented_session() {
        let (svc, _) = service();
        let first = svc.sign_up(&sign_up_input("erin@example.com"), ClientInfo::default()).await.unwrap();
        let second = svc.sign_in("erin@example.com", PASSWORD, ClientInfo::default()).await.unwrap();

        assert!(svc.sign_out(Some(&first.token)).await.unwrap());
        assert!(!svc.sign_out(Some(&first.token)).await.unwrap());
        assert!(!svc.sign_out(None).await.unwrap());
        assert!(svc.resolve_session(&first.token).await.is_none());
        assert!(svc.resolve_session(&second.token).await.is_some());
    }

    #[tokio::test]
    async fn change_password_can_revoke_other_sessions() {
        let (svc, _) = service();
        let current = svc.sign_up(&sign_up_input("fay@example.com"), ClientInfo::default()).await.unwrap();
        let other = svc.sign_in("fay@example.com", PASSWORD, ClientInfo::default()).await.unwrap();
        let resolved = svc.resolve_session(&current.token).await.unwrap();

        let err = svc.change_password(&resolved, "wrong", "N3w-password", true).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidPassword));
        let err = svc.change_password(&resolved, PASSWORD, "weak", true).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));

        svc.change_password(&resolved, PASSWORD, "N3w-password", true).await.unwrap();
        assert!(svc.resolve_session(&current.token).await.is_some());
        assert!(svc.resolve_session(&other.token).await.is_none());
        assert!(svc.sign_in("fay@example.com", "N3w-password", ClientInfo::default()).await.is_ok());
    }

    #[tokio::test]
    async fn admin_emails_get_admin_role() {
        let (svc, _) = service();
        let issued = svc.sign_up(&sign_up_input("boss@example.com"), ClientInfo::default()).await.unwrap();
        assert_eq!(issued.user.role, Role::Admin);
    }

    #[tokio::test]
    async fn social_sign_in_creates_then_reuses_user() {
        let (svc, _) = service();
        let redirect = "http://localhost/api/auth/callback/github";

        let url = svc.begin_social("github", redirect).await.unwrap();
        let first = svc
            .complete_social("github", "good-code", &state_from(&url), redirect, ClientInfo::default())
            .await
            .unwrap();
        assert_eq!(first.user.email, "octo@example.com");
        assert!(first.user.email_verified);

        let url = svc.begin_social("github", redirect).await.unwrap();
        let second = svc
            .complete_social("github", "good-code", &state_from(&url), redirect, ClientInfo::default())
            .await
            .unwrap();
        assert_eq!(second.user.id, first.user.id);
    }

    #[tokio::test]
    async fn social_sign_in_links_by_verified_email() {
        let (svc, store) = service();
        let existing = svc.sign_up(&sign_up_input("octo@example.com"), ClientInfo::default()).await.unwrap();

        let url = svc.begin_social("github", "http://cb").await.unwrap();
        let issued = svc
            .complete_social("github", "good-code", &state_from(&url), "http://cb", ClientInfo::default())
            .await
            .unwrap();

        assert_eq!(issued.user.id, existing.user.id);
        assert!(store.find_account(ProviderId::Github, "gh-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unverified_email_is_not_linked() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service_with(store, github_profile("octo@example.com", false));
        svc.sign_up(&sign_up_input("octo@example.com"), ClientInfo::default()).await.unwrap();

        let url = svc.begin_social("github", "http://cb").await.unwrap();
        let err = svc
            .complete_social("github", "good-code", &state_from(&url), "http://cb", ClientInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn state_is_single_use_and_provider_bound() {
        let (svc, _) = service();
        let url = svc.begin_social("github", "http://cb").await.unwrap();
        let state = state_from(&url);

        svc.complete_social("github", "good-code", &state, "http://cb", ClientInfo::default())
            .await
            .unwrap();
        let replay = svc
            .complete_social("github", "good-code", &state, "http://cb", ClientInfo::default())
            .await;
        assert!(matches!(replay, Err(AuthError::InvalidState)));

        let forged = svc
            .complete_social("github", "good-code", "made-up", "http://cb", ClientInfo::default())
            .await;
        assert!(matches!(forged, Err(AuthError::InvalidState)));
    }

    #[tokio::test]
    async fn unknown_providers_are_rejected() {
        let (svc, _) = service();
        assert!(svc.provider_enabled("github"));
        assert!(!svc.provider_enabled("google"));
        for provider in ["google", "credential", "myspace"] {
            assert!(matches!(
                svc.begin_social(provider, "http://cb").await,
                Err(AuthError::UnknownProvider(_))
            ));
        }
    }
}
