// Auth Service Library

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod security;
pub mod services;

pub use error::{AuthError, Result};

use std::sync::Arc;

use db::{CredentialStore, InMemoryCredentialStore};
use security::{
    Authenticator, InMemoryRevocationRegistry, PasswordHasher, RevocationRegistry, TokenIssuer,
};
use services::AccountService;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub authenticator: Authenticator,
}

impl AppState {
    /// Wire the account service and authenticator over the same issuer and
    /// registry, so a logout is seen by the very next authentication.
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        registry: Arc<dyn RevocationRegistry>,
        issuer: Arc<TokenIssuer>,
        hasher: PasswordHasher,
    ) -> Result<Self> {
        let authenticator = Authenticator::new(issuer.clone(), registry.clone());
        let accounts = AccountService::new(credentials, registry, issuer, hasher)?;

        Ok(Self {
            accounts: Arc::new(accounts),
            authenticator,
        })
    }

    /// State backed by process-local stores.
    pub fn in_memory(issuer: Arc<TokenIssuer>, hasher: PasswordHasher) -> Result<Self> {
        Self::new(
            Arc::new(InMemoryCredentialStore::new()),
            Arc::new(InMemoryRevocationRegistry::new()),
            issuer,
            hasher,
        )
    }
}
