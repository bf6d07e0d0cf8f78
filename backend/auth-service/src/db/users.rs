/// Credential store: identity -> password hash
use async_trait::async_trait;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use sqlx::PgPool;

use crate::models::Account;

/// PostgreSQL unique_violation
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("identity already registered")]
    AlreadyExists,

    #[error("identity not found")]
    NotFound,

    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::AlreadyExists
            }
            _ => {
                tracing::error!("Database error in credential store: {}", err);
                StoreError::Unavailable(err.to_string())
            }
        }
    }
}

/// Persistent identity -> password-hash mapping.
///
/// `create` must be atomic with respect to identity uniqueness: of two
/// concurrent creates for the same identity exactly one succeeds.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn create(&self, identity: &str, password_hash: &str) -> Result<(), StoreError>;

    async fn lookup_hash(&self, identity: &str) -> Result<String, StoreError>;
}

pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find account by identity
    pub async fn find_by_identity(&self, identity: &str) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT identity, password_hash, created_at FROM accounts WHERE identity = $1",
        )
        .bind(identity)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create(&self, identity: &str, password_hash: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (identity, password_hash)
            VALUES ($1, $2)
            ON CONFLICT (identity) DO NOTHING
            "#,
        )
        .bind(identity)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists);
        }
        Ok(())
    }

    async fn lookup_hash(&self, identity: &str) -> Result<String, StoreError> {
        self.find_by_identity(identity)
            .await?
            .map(|account| account.password_hash)
            .ok_or(StoreError::NotFound)
    }
}

/// Process-local credential store.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    accounts: DashMap<String, Account>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn create(&self, identity: &str, password_hash: &str) -> Result<(), StoreError> {
        match self.accounts.entry(identity.to_string()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(Account {
                    identity: identity.to_string(),
                    password_hash: password_hash.to_string(),
                    created_at: Utc::now(),
                });
                Ok(())
            }
        }
    }

    async fn lookup_hash(&self, identity: &str) -> Result<String, StoreError> {
        self.accounts
            .get(identity)
            .map(|account| account.password_hash.clone())
            .ok_or(StoreError::NotFound)
    }
}
