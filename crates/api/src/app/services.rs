//! Service wiring: pick a store backend and build the services on top of it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;

use tickbox_infra::oauth::{GithubProvider, GoogleProvider, OAuthProviders};
use tickbox_infra::services::{AdminService, AuthService, TodoService};
use tickbox_infra::store::{
    InMemoryStore, PostgresStore, SessionStore, StoreError, TodoStore, UserStore, VerificationStore,
};

use crate::config::AppConfig;

/// Everything handlers need, shared behind an `Arc`.
pub struct AppServices {
    pub auth: AuthService,
    pub todos: TodoService,
    pub admin: AdminService,
    pub config: AppConfig,
}

pub async fn build_services(config: AppConfig) -> Result<AppServices, StoreError> {
    match config.database_url.clone() {
        Some(url) => {
            let store = Arc::new(PostgresStore::connect(&url).await?);
            tracing::info!("using postgres store");
            Ok(wire(store, config))
        }
        None => {
            tracing::info!("using in-memory store");
            Ok(wire(Arc::new(InMemoryStore::new()), config))
        }
    }
}

fn wire<S>(store: Arc<S>, config: AppConfig) -> AppServices
where
    S: UserStore + SessionStore + VerificationStore + TodoStore + 'static,
{
    let auth = AuthService::new(store.clone(), store.clone(), store.clone(), config.session_ttl)
        .with_providers(oauth_providers(&config))
        .with_admin_emails(&config.admin_emails);

    AppServices {
        auth,
        todos: TodoService::new(store.clone()),
        admin: AdminService::new(store.clone(), store),
        config,
    }
}

/// How often expired sessions and OAuth states are deleted.
pub const PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Periodically delete expired auth rows. The first run happens immediately.
pub fn spawn_auth_purge(services: Arc<AppServices>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = services.auth.purge_expired(Utc::now()).await {
                tracing::warn!(error = %e, "purging expired auth rows failed");
            }
        }
    })
}

fn oauth_providers(config: &AppConfig) -> OAuthProviders {
    let mut providers = OAuthProviders::new();
    if let Some(creds) = &config.github {
        providers.register(Arc::new(GithubProvider::new(creds.clone())));
    }
    if let Some(creds) = &config.google {
        providers.register(Arc::new(GoogleProvider::new(creds.clone())));
    }
    tracing::info!(providers = ?providers.enabled(), "social sign-in providers");
    providers
}
