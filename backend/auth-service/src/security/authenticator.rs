/// Request authentication decision
///
/// Given the raw `Authorization` header of a request, decide whether it
/// carries a currently valid credential:
///
/// 1. header missing                        -> `NoCredential`
/// 2. not `Bearer <token>`, or empty token  -> `Malformed`
/// 3. signature, algorithm or expiry fails  -> `Invalid`
/// 4. token present in revocation registry  -> `Revoked`
/// 5. otherwise                             -> `Accepted`
///
/// Clients see the same 401 for every rejection; the reason only reaches
/// logs and metrics.
use crypto_core::jwt::{TokenIssuer, VerifiedToken};
use std::fmt;
use std::sync::Arc;

use crate::error::AuthError;
use crate::metrics;
use crate::security::token_revocation::RevocationRegistry;

const BEARER_SCHEME: &str = "bearer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoCredential,
    Malformed,
    Invalid,
    Revoked,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::NoCredential => "no_credential",
            Rejection::Malformed => "malformed",
            Rejection::Invalid => "invalid",
            Rejection::Revoked => "revoked",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Accepted(VerifiedToken),
    Rejected(Rejection),
}

/// Pull the token out of an `Authorization` header value.
///
/// The scheme name is matched case-insensitively. Anything after the first
/// space, trimmed, is the token.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, Rejection> {
    let value = header.ok_or(Rejection::NoCredential)?;
    let (scheme, rest) = value.split_once(' ').ok_or(Rejection::Malformed)?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return Err(Rejection::Malformed);
    }

    let token = rest.trim();
    if token.is_empty() {
        return Err(Rejection::Malformed);
    }
    Ok(token)
}

#[derive(Clone)]
pub struct Authenticator {
    issuer: Arc<TokenIssuer>,
    registry: Arc<dyn RevocationRegistry>,
}

impl Authenticator {
    pub fn new(issuer: Arc<TokenIssuer>, registry: Arc<dyn RevocationRegistry>) -> Self {
        Self { issuer, registry }
    }

    /// Run the decision procedure for one request.
    ///
    /// `Err` is reserved for infrastructure failure (the registry could not
    /// be consulted); every credential problem is an `Ok(Rejected(..))`.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<AuthOutcome, AuthError> {
        let token = match extract_bearer(header) {
            Ok(token) => token,
            Err(reason) => return Ok(reject(reason)),
        };

        let verified = match self.issuer.verify(token) {
            Ok(verified) => verified,
            Err(e) => {
                tracing::debug!(error = %e, "bearer token failed verification");
                return Ok(reject(Rejection::Invalid));
            }
        };

        if self.registry.is_revoked(token).await? {
            tracing::info!(identity = %verified.identity, "revoked token presented");
            return Ok(reject(Rejection::Revoked));
        }

        metrics::record_auth_decision("accepted");
        Ok(AuthOutcome::Accepted(verified))
    }
}

fn reject(reason: Rejection) -> AuthOutcome {
    tracing::warn!(reason = %reason, "request rejected");
    metrics::record_auth_decision(reason.as_str());
    AuthOutcome::Rejected(reason)
}
