/// Configuration management
///
/// Settings are read from the process environment (after loading an optional
/// `.env` file). Every field has a serde default except the signing secret and,
/// for the `postgres` backend, the database and Redis URLs.
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// PostgreSQL for accounts, Redis for revocations
    #[default]
    Postgres,
    /// Process-local maps, nothing survives a restart
    Memory,
}

#[derive(Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_host")]
    pub app_host: String,
    #[serde(default = "default_port")]
    pub app_port: u16,

    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_token_lifetime_secs")]
    pub jwt_token_lifetime_secs: u64,

    #[serde(default)]
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    #[serde(default = "default_revocation_key_prefix")]
    pub revocation_key_prefix: String,

    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_token_lifetime_secs() -> u64 {
    crypto_core::jwt::DEFAULT_TOKEN_LIFETIME.as_secs()
}

fn default_database_max_connections() -> u32 {
    10
}

fn default_revocation_key_prefix() -> String {
    "auth:revoked:token:".to_string()
}

fn default_argon2_memory_kib() -> u32 {
    argon2::Params::DEFAULT_M_COST
}

fn default_argon2_iterations() -> u32 {
    argon2::Params::DEFAULT_T_COST
}

fn default_argon2_parallelism() -> u32 {
    argon2::Params::DEFAULT_P_COST
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("app_host", &self.app_host)
            .field("app_port", &self.app_port)
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_token_lifetime_secs", &self.jwt_token_lifetime_secs)
            .field("storage_backend", &self.storage_backend)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("database_max_connections", &self.database_max_connections)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("revocation_key_prefix", &self.revocation_key_prefix)
            .field("argon2_memory_kib", &self.argon2_memory_kib)
            .field("argon2_iterations", &self.argon2_iterations)
            .field("argon2_parallelism", &self.argon2_parallelism)
            .finish()
    }
}

impl Settings {
    /// Load `.env` if present, then read and validate the environment.
    pub fn load() -> Result<Self, AuthError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!("Failed to read .env file: {}", e);
            }
        }
        Self::from_env()
    }

    pub fn from_env() -> Result<Self, AuthError> {
        let settings: Settings =
            envy::from_env().map_err(|e| AuthError::Configuration(e.to_string()))?;
        settings.validated()
    }

    /// Build settings from explicit `(NAME, value)` pairs.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, AuthError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let settings: Settings =
            envy::from_iter(pairs).map_err(|e| AuthError::Configuration(e.to_string()))?;
        settings.validated()
    }

    fn validated(self) -> Result<Self, AuthError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(AuthError::Configuration(
                "JWT_SECRET must be set".to_string(),
            ));
        }
        if self.jwt_secret.len() < crypto_core::jwt::MIN_SECRET_BYTES {
            return Err(AuthError::Configuration(format!(
                "JWT_SECRET must be at least {} bytes",
                crypto_core::jwt::MIN_SECRET_BYTES
            )));
        }
        let max_lifetime = crypto_core::jwt::MAX_TOKEN_LIFETIME.as_secs();
        if self.jwt_token_lifetime_secs == 0 || self.jwt_token_lifetime_secs > max_lifetime {
            return Err(AuthError::Configuration(format!(
                "JWT_TOKEN_LIFETIME_SECS must be between 1 and {}",
                max_lifetime
            )));
        }
        if self.storage_backend == StorageBackend::Postgres {
            if self.database_url.as_deref().map_or(true, str::is_empty) {
                return Err(AuthError::Configuration(
                    "DATABASE_URL must be set for the postgres backend".to_string(),
                ));
            }
            if self.redis_url.as_deref().map_or(true, str::is_empty) {
                return Err(AuthError::Configuration(
                    "REDIS_URL must be set for the postgres backend".to_string(),
                ));
            }
        }
        Ok(self)
    }

    pub fn token_lifetime(&self) -> Duration {
        Duration::from_secs(self.jwt_token_lifetime_secs)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.app_host.clone(), self.app_port)
    }
}
