use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::{Client, ConnectionInfo, IntoConnectionInfo, RedisError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Duration;
use tracing::info;

/// Shared Redis connection manager guarded by a Tokio mutex.
pub type SharedConnectionManager = Arc<Mutex<ConnectionManager>>;

/// Upper bound for a single Redis command issued through [`with_timeout`].
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Redis connection pool backed by a reconnecting [`ConnectionManager`].
pub struct RedisPool {
    manager: SharedConnectionManager,
}

impl RedisPool {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let info: ConnectionInfo = redis_url
            .into_connection_info()
            .context("failed to parse REDIS_URL connection string")?;

        let client = Client::open(info).context("failed to construct Redis client")?;
        let connection_manager = ConnectionManager::new(client)
            .await
            .context("failed to initialize Redis connection manager")?;

        info!("Redis connection manager ready");

        Ok(Self {
            manager: Arc::new(Mutex::new(connection_manager)),
        })
    }

    pub fn manager(&self) -> SharedConnectionManager {
        self.manager.clone()
    }
}

/// Run a Redis command future, failing with an I/O timeout error if it
/// takes longer than [`DEFAULT_COMMAND_TIMEOUT`].
pub async fn with_timeout<F, T>(future: F) -> Result<T, RedisError>
where
    F: Future<Output = Result<T, RedisError>>,
{
    with_timeout_of(DEFAULT_COMMAND_TIMEOUT, future).await
}

/// Same as [`with_timeout`] with an explicit bound.
pub async fn with_timeout_of<F, T>(duration: Duration, future: F) -> Result<T, RedisError>
where
    F: Future<Output = Result<T, RedisError>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(RedisError::from((
            redis::ErrorKind::IoError,
            "redis command timed out",
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_passes_through_result() {
        let value = with_timeout(async { Ok::<_, RedisError>(42) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_with_timeout_elapsed_is_io_error() {
        let err = with_timeout_of(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, RedisError>(())
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind(), redis::ErrorKind::IoError);
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_url() {
        assert!(RedisPool::connect("not a url").await.is_err());
    }
}
