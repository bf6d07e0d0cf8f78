/// Bearer token revocation
///
/// Handles token blacklisting for logout. Entries are keyed by the SHA-256
/// fingerprint of the token and expire on their own once the token could no
/// longer verify anyway.
///
/// ## Backends
///
/// - [`RedisRevocationRegistry`]: shared across instances, `SET .. EX` per entry
/// - [`InMemoryRevocationRegistry`]: process-local, for tests and single-node runs
use async_trait::async_trait;
use crypto_core::hash::token_fingerprint;
use dashmap::DashMap;
use redis_utils::SharedConnectionManager;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("revocation registry unavailable: {0}")]
    Unavailable(String),
}

impl From<redis::RedisError> for RegistryError {
    fn from(err: redis::RedisError) -> Self {
        tracing::error!("Redis error in revocation registry: {}", err);
        RegistryError::Unavailable(err.to_string())
    }
}

/// Store of tokens invalidated before their natural expiry.
///
/// `revoke` is idempotent and never shortens an existing entry. There is no
/// way to un-revoke a token.
#[async_trait]
pub trait RevocationRegistry: Send + Sync {
    /// Remember `token` as revoked for at least `ttl`.
    async fn revoke(&self, token: &str, ttl: Duration) -> Result<(), RegistryError>;

    async fn is_revoked(&self, token: &str) -> Result<bool, RegistryError>;
}

/// Whole seconds covering `ttl`, never zero.
fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

// =========================
// Redis
// =========================

pub struct RedisRevocationRegistry {
    redis: SharedConnectionManager,
    key_prefix: String,
}

impl RedisRevocationRegistry {
    pub fn new(redis: SharedConnectionManager, key_prefix: impl Into<String>) -> Self {
        Self {
            redis,
            key_prefix: key_prefix.into(),
        }
    }

    fn key(&self, token: &str) -> String {
        format!("{}{}", self.key_prefix, token_fingerprint(token))
    }
}

#[async_trait]
impl RevocationRegistry for RedisRevocationRegistry {
    async fn revoke(&self, token: &str, ttl: Duration) -> Result<(), RegistryError> {
        let key = self.key(token);
        let ttl = ttl_secs(ttl);

        // NX keeps an existing entry, EXPIRE GT only ever extends it (Redis >= 7).
        let mut redis_conn = self.redis.lock().await.clone();
        redis_utils::with_timeout(async {
            redis::pipe()
                .atomic()
                .cmd("SET")
                .arg(&key)
                .arg("1")
                .arg("EX")
                .arg(ttl)
                .arg("NX")
                .ignore()
                .cmd("EXPIRE")
                .arg(&key)
                .arg(ttl)
                .arg("GT")
                .ignore()
                .query_async::<_, ()>(&mut redis_conn)
                .await
        })
        .await?;

        tracing::info!(
            "Token revoked, blacklist entry will expire in {} seconds",
            ttl
        );
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, RegistryError> {
        let key = self.key(token);

        let mut redis_conn = self.redis.lock().await.clone();
        let exists: bool = redis_utils::with_timeout(async {
            redis::cmd("EXISTS")
                .arg(&key)
                .query_async(&mut redis_conn)
                .await
        })
        .await?;

        Ok(exists)
    }
}

// =========================
// In-memory
// =========================

#[derive(Default)]
pub struct InMemoryRevocationRegistry {
    entries: DashMap<String, Instant>,
}

impl InMemoryRevocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries whose deadline has passed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, deadline| *deadline > now);
        before.saturating_sub(self.entries.len())
    }

    /// Periodically purge expired entries until the registry is dropped.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let registry = Arc::downgrade(&self);
        drop(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let purged = registry.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, "purged expired revocation entries");
                }
            }
        })
    }
}

#[async_trait]
impl RevocationRegistry for InMemoryRevocationRegistry {
    async fn revoke(&self, token: &str, ttl: Duration) -> Result<(), RegistryError> {
        let deadline = Instant::now() + Duration::from_secs(ttl_secs(ttl));

        self.entries
            .entry(token_fingerprint(token))
            .and_modify(|existing| {
                if *existing < deadline {
                    *existing = deadline;
                }
            })
            .or_insert(deadline);

        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, RegistryError> {
        let key = token_fingerprint(token);
        let now = Instant::now();

        let live = match self.entries.get(&key) {
            Some(deadline) => *deadline > now,
            None => return Ok(false),
        };

        if !live {
            self.entries.remove_if(&key, |_, deadline| *deadline <= now);
        }
        Ok(live)
    }
}
