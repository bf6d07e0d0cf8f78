/// Account service: register, login and logout
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::db::{CredentialStore, StoreError};
use crate::error::{AuthError, Result};
use crate::metrics;
use crate::security::{extract_bearer, PasswordHasher, RevocationRegistry, TokenIssuer};

/// Added to a token's remaining lifetime when revoking, covers the
/// second-granularity rounding between `exp` and the registry TTL.
const REVOCATION_GRACE: Duration = Duration::from_secs(1);

/// Verified against when the identity is unknown so both login failure
/// paths cost one Argon2 verification.
const TIMING_PLACEHOLDER: &str = "placeholder-password-for-unknown-identities";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// A live token was added to the revocation registry
    Revoked,
    /// The token could no longer verify, nothing to record
    AlreadyInvalid,
}

pub struct AccountService {
    credentials: Arc<dyn CredentialStore>,
    registry: Arc<dyn RevocationRegistry>,
    issuer: Arc<TokenIssuer>,
    hasher: PasswordHasher,
    dummy_hash: String,
}

impl AccountService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        registry: Arc<dyn RevocationRegistry>,
        issuer: Arc<TokenIssuer>,
        hasher: PasswordHasher,
    ) -> Result<Self> {
        let dummy_hash = hasher.hash(TIMING_PLACEHOLDER)?;
        Ok(Self {
            credentials,
            registry,
            issuer,
            hasher,
            dummy_hash,
        })
    }

    /// Create an account for `identity`.
    pub async fn register(&self, identity: &str, password: &str) -> Result<()> {
        let result = self.register_inner(identity, password).await;
        metrics::record_account_operation("register", result.is_ok());
        result
    }

    async fn register_inner(&self, identity: &str, password: &str) -> Result<()> {
        validate_credentials(identity, password)?;

        let hash = self.hash_blocking(password).await?;
        match self.credentials.create(identity, &hash).await {
            Ok(()) => {
                tracing::info!(identity = %identity, "account registered");
                Ok(())
            }
            Err(StoreError::AlreadyExists) => {
                tracing::info!(identity = %identity, "registration for existing identity");
                Err(AuthError::AlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check credentials and mint a token.
    ///
    /// Unknown identity and wrong password produce the same error.
    pub async fn login(&self, identity: &str, password: &str) -> Result<String> {
        let result = self.login_inner(identity, password).await;
        metrics::record_account_operation("login", result.is_ok());
        result
    }

    async fn login_inner(&self, identity: &str, password: &str) -> Result<String> {
        validate_credentials(identity, password)?;

        let stored = match self.credentials.lookup_hash(identity).await {
            Ok(hash) => Some(hash),
            Err(StoreError::NotFound) => None,
            Err(e) => return Err(e.into()),
        };

        let known = stored.is_some();
        let candidate = stored.unwrap_or_else(|| self.dummy_hash.clone());

        let matches = match self.verify_blocking(password, candidate).await {
            Ok(matches) => matches,
            Err(AuthError::CorruptCredential(msg)) => {
                tracing::error!(identity = %identity, "stored password hash is corrupt: {}", msg);
                return Err(AuthError::CorruptCredential(msg));
            }
            Err(e) => return Err(e),
        };

        if !(known && matches) {
            tracing::info!("login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issuer.issue(identity).map_err(|e| {
            tracing::error!("failed to sign token: {}", e);
            AuthError::Internal(e.to_string())
        })?;

        tracing::info!(identity = %identity, "login succeeded");
        Ok(token)
    }

    /// Revoke the bearer token carried in `authorization`.
    ///
    /// A missing or malformed header is a 401; a token that no longer
    /// verifies needs no registry entry and still counts as a logout.
    pub async fn logout(&self, authorization: Option<&str>) -> Result<LogoutOutcome> {
        let result = self.logout_inner(authorization).await;
        metrics::record_account_operation("logout", result.is_ok());
        result
    }

    async fn logout_inner(&self, authorization: Option<&str>) -> Result<LogoutOutcome> {
        let token = extract_bearer(authorization).map_err(AuthError::Unauthenticated)?;

        let now = Utc::now();
        let verified = match self.issuer.verify_at(token, now) {
            Ok(verified) => verified,
            Err(e) => {
                tracing::debug!(error = %e, "logout with token that no longer verifies");
                return Ok(LogoutOutcome::AlreadyInvalid);
            }
        };

        let ttl = verified.remaining_lifetime(now) + REVOCATION_GRACE;
        self.registry.revoke(token, ttl).await?;

        tracing::info!(
            identity = %verified.identity,
            token_id = %verified.token_id,
            "logged out"
        );
        Ok(LogoutOutcome::Revoked)
    }

    async fn hash_blocking(&self, password: &str) -> Result<String> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password)).await??;
        Ok(hash)
    }

    async fn verify_blocking(&self, password: &str, stored_hash: String) -> Result<bool> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let matches =
            tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash)).await??;
        Ok(matches)
    }
}

fn validate_credentials(identity: &str, password: &str) -> Result<()> {
    if identity.trim().is_empty() {
        return Err(AuthError::InvalidInput("identity must not be empty".to_string()));
    }
    if password.is_empty() {
        return Err(AuthError::InvalidInput("password must not be empty".to_string()));
    }
    Ok(())
}
