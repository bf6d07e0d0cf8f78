/// Auth Service - HTTP entry point
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use auth_service::{
    config::{Settings, StorageBackend},
    db::{CredentialStore, InMemoryCredentialStore, PgCredentialStore},
    metrics::initialize_auth_metrics,
    routes,
    security::{
        InMemoryRevocationRegistry, PasswordHasher, RedisRevocationRegistry, RevocationRegistry,
        TokenIssuer,
    },
    AppState,
};

const REVOCATION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

#[actix_web::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "auth_service=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting Auth Service");

    let settings = Settings::load().context("Failed to load configuration")?;
    info!(?settings, "Configuration loaded");

    let issuer = Arc::new(
        TokenIssuer::new(settings.jwt_secret.as_bytes(), settings.token_lifetime())
            .context("Failed to initialize token issuer")?,
    );
    let hasher = PasswordHasher::new(
        settings.argon2_memory_kib,
        settings.argon2_iterations,
        settings.argon2_parallelism,
    )
    .context("Invalid password hashing parameters")?;

    let (credentials, registry) = build_stores(&settings).await?;
    let state = AppState::new(credentials, registry, issuer, hasher)
        .context("Failed to build application state")?;

    initialize_auth_metrics();

    let (host, port) = settings.bind_address();
    info!("HTTP server listening on {}:{}", host, port);

    let data = web::Data::new(state);
    HttpServer::new(move || {
        App::new()
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(|cfg| routes::configure(cfg, data.clone()))
    })
    .bind((host.as_str(), port))
    .with_context(|| format!("Failed to bind {}:{}", host, port))?
    .shutdown_timeout(SHUTDOWN_TIMEOUT_SECS)
    .run()
    .await
    .context("HTTP server error")?;

    info!("Auth Service shut down");
    Ok(())
}

async fn build_stores(
    settings: &Settings,
) -> Result<(Arc<dyn CredentialStore>, Arc<dyn RevocationRegistry>)> {
    match settings.storage_backend {
        StorageBackend::Postgres => {
            let database_url = settings
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres backend")?;
            let redis_url = settings
                .redis_url
                .as_deref()
                .context("REDIS_URL is required for the postgres backend")?;

            let db_config = db_pool::DbConfig::new("auth-service", database_url)
                .with_max_connections(settings.database_max_connections);
            let pool = db_pool::create_pool(db_config)
                .await
                .context("Failed to connect to PostgreSQL")?;

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;
            info!("Database migrations applied");

            let redis = redis_utils::RedisPool::connect(redis_url)
                .await
                .context("Failed to connect to Redis")?;

            let credentials: Arc<dyn CredentialStore> = Arc::new(PgCredentialStore::new(pool));
            let registry: Arc<dyn RevocationRegistry> = Arc::new(RedisRevocationRegistry::new(
                redis.manager(),
                settings.revocation_key_prefix.clone(),
            ));
            Ok((credentials, registry))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; accounts and revocations are lost on restart");

            let in_memory = Arc::new(InMemoryRevocationRegistry::new());
            in_memory.clone().spawn_sweeper(REVOCATION_SWEEP_INTERVAL);
            let registry: Arc<dyn RevocationRegistry> = in_memory;

            let credentials: Arc<dyn CredentialStore> = Arc::new(InMemoryCredentialStore::new());
            Ok((credentials, registry))
        }
    }
}
