//! Store and service wiring.

use std::sync::Arc;

use anyhow::Context;
use chrono::Duration;
use sqlx::postgres::PgPoolOptions;

use gatehouse_auth::{
    AccountStore, BcryptHasher, CredentialHasher, CredentialValidator, RefreshTokenStore, SessionService,
    Sha256Hasher, TokenIssuer,
};
use gatehouse_infra::store::apply_schema;
use gatehouse_infra::{
    AppConfig, InMemoryAccountStore, InMemoryRefreshTokenStore, PostgresAccountStore, PostgresRefreshTokenStore,
};

/// How the refresh cookie is written.
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    pub secure: bool,
    pub max_age: Duration,
}

#[derive(Clone)]
pub struct AppServices {
    pub sessions: SessionService,
    pub validator: CredentialValidator,
    pub cookie: CookiePolicy,
}

/// Build services from config: Postgres when `DATABASE_URL` is set, otherwise
/// in-memory stores.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let (accounts, refresh_tokens) = build_stores(config).await?;

    let issuer = TokenIssuer::with_ttls(
        config.access_secret.as_bytes(),
        config.refresh_secret.as_bytes(),
        config.access_ttl,
        config.refresh_ttl,
    )
    .context("invalid token secrets")?;

    let passwords: Arc<dyn CredentialHasher> = Arc::new(BcryptHasher::new(config.bcrypt_cost));
    let token_hasher: Arc<dyn CredentialHasher> = Arc::new(Sha256Hasher);

    let sessions = SessionService::new(accounts.clone(), refresh_tokens, issuer.clone(), passwords, token_hasher)
        .await
        .context("failed to initialize session service")?;
    let validator = CredentialValidator::new(issuer, accounts);

    Ok(AppServices {
        sessions,
        validator,
        cookie: CookiePolicy {
            secure: config.environment.is_production(),
            max_age: config.refresh_ttl,
        },
    })
}

async fn build_stores(config: &AppConfig) -> anyhow::Result<(Arc<dyn AccountStore>, Arc<dyn RefreshTokenStore>)> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set; using in-memory stores (data is lost on restart)");
        return Ok((
            Arc::new(InMemoryAccountStore::new()),
            Arc::new(InMemoryRefreshTokenStore::new()),
        ));
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("failed to connect to database")?;
    apply_schema(&pool).await.context("failed to apply database schema")?;

    tracing::info!("using postgres stores");
    Ok((
        Arc::new(PostgresAccountStore::new(pool.clone())),
        Arc::new(PostgresRefreshTokenStore::new(pool)),
    ))
}
