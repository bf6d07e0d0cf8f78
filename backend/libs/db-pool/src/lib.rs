//! PostgreSQL connection pool for the auth service

mod metrics;

use metrics::update_pool_metrics;

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::fmt;
use std::time::Duration;
use tracing::info;

const METRICS_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct DbConfig {
    /// `service` label on the pool gauges
    pub service_name: String,
    pub database_url: String,
    pub max_connections: u32,
    /// How long a request may wait for a free connection
    pub acquire_timeout: Duration,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("service_name", &self.service_name)
            .field("database_url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

impl DbConfig {
    pub fn new(service_name: &str, database_url: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            database_url: database_url.to_string(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .test_before_acquire(true)
    }
}

/// Connect a pool and keep its gauges refreshed until the pool is closed.
pub async fn create_pool(config: DbConfig) -> Result<PgPool, sqlx::Error> {
    let pool = config.pool_options().connect(&config.database_url).await?;
    info!(
        service = %config.service_name,
        max_connections = config.max_connections,
        "Database pool created"
    );

    update_pool_metrics(&pool, &config.service_name);
    let monitored = pool.clone();
    let service = config.service_name;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(METRICS_REFRESH_INTERVAL);
        while !monitored.is_closed() {
            interval.tick().await;
            update_pool_metrics(&monitored, &service);
        }
    });

    Ok(pool)
}
