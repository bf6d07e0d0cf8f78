/// Bearer token issuing and verification
///
/// Tokens are HS256 JWTs signed with a single shared secret. The secret is
/// handed to [`TokenIssuer::new`] by the caller; nothing in this module reads
/// the environment or keeps keys in global state, so two issuers built from
/// different secrets never accept each other's tokens.
///
/// ## Security Design
///
/// - **HS256 ONLY**: tokens whose header names any other algorithm are rejected
/// - **Zero leeway**: a token is expired from the second its `exp` is reached
/// - **Opaque failures**: [`TokenError`] keeps the failure cause for logging,
///   callers are expected to collapse every variant into one "invalid" answer
///
/// ## Usage
///
/// ```rust
/// use crypto_core::jwt::TokenIssuer;
/// use std::time::Duration;
///
/// let issuer = TokenIssuer::new(
///     b"0123456789abcdef0123456789abcdef",
///     Duration::from_secs(72 * 3600),
/// )
/// .unwrap();
///
/// let token = issuer.issue("alice").unwrap();
/// let verified = issuer.verify(&token).unwrap();
/// assert_eq!(verified.identity, "alice");
/// ```
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// Default token lifetime: 72 hours
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(72 * 60 * 60);

/// Longest token lifetime accepted by [`TokenIssuer::new`]: 365 days
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Shortest signing secret accepted by [`TokenIssuer::new`]
pub const MIN_SECRET_BYTES: usize = 32;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

// ============================================================================
// Data Structures
// ============================================================================

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (the authenticated identity)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Unique token id, keeps two tokens minted in the same second distinct
    pub jti: String,
}

/// Result of a successful verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub identity: String,
    pub token_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VerifiedToken {
    /// Time left until the token expires naturally, zero once it has.
    pub fn remaining_lifetime(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("signing secret must be at least 32 bytes")]
    WeakSecret,

    #[error("token lifetime must be between one second and 365 days")]
    InvalidLifetime,

    #[error("token expired")]
    Expired,

    #[error("token signature mismatch")]
    BadSignature,

    #[error("token signed with an unexpected algorithm")]
    WrongAlgorithm,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenError::WrongAlgorithm
            }
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

// ============================================================================
// Issuer
// ============================================================================

/// Mints and verifies bearer tokens with one shared HS256 secret.
///
/// Cheap to clone; the keys are immutable after construction.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: ChronoDuration,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &JWT_ALGORITHM)
            .field("secret", &"[REDACTED]")
            .field("lifetime_secs", &self.lifetime.num_seconds())
            .finish()
    }
}

impl TokenIssuer {
    /// Build an issuer from a raw secret and a fixed token lifetime.
    ///
    /// ## Errors
    ///
    /// - [`TokenError::WeakSecret`] if the secret is shorter than [`MIN_SECRET_BYTES`]
    /// - [`TokenError::InvalidLifetime`] if the lifetime is under one second
    ///   or longer than [`MAX_TOKEN_LIFETIME`]
    pub fn new(secret: &[u8], lifetime: Duration) -> Result<Self, TokenError> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(TokenError::WeakSecret);
        }
        if lifetime.as_secs() == 0 || lifetime > MAX_TOKEN_LIFETIME {
            return Err(TokenError::InvalidLifetime);
        }
        let lifetime =
            ChronoDuration::from_std(lifetime).map_err(|_| TokenError::InvalidLifetime)?;

        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.leeway = 0;
        // Expiry is checked against the caller-supplied clock in `verify_at`.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            lifetime,
        })
    }

    /// Lifetime stamped into every token this issuer mints
    pub fn lifetime(&self) -> Duration {
        self.lifetime.to_std().unwrap_or(DEFAULT_TOKEN_LIFETIME)
    }

    /// Issue a token for `identity`, valid from now for the configured lifetime.
    pub fn issue(&self, identity: &str) -> Result<String, TokenError> {
        self.issue_at(identity, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, identity: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            sub: identity.to_string(),
            iat: now.timestamp(),
            exp: now
                .checked_add_signed(self.lifetime)
                .ok_or(TokenError::InvalidLifetime)?
                .timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature, algorithm and expiry of `token`.
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify `token` against the given clock reading.
    ///
    /// A token is rejected once `now >= exp`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedToken, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        let claims = data.claims;

        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        let issued_at = DateTime::from_timestamp(claims.iat, 0)
            .ok_or_else(|| TokenError::Malformed("iat out of range".to_string()))?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| TokenError::Malformed("exp out of range".to_string()))?;

        Ok(VerifiedToken {
            identity: claims.sub,
            token_id: claims.jti,
            issued_at,
            expires_at,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::SubsecRound;

    const SECRET: &[u8] = b"test-secret-that-is-long-enough-for-hs256";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SECRET, DEFAULT_TOKEN_LIFETIME).unwrap()
    }

    #[test]
    fn test_rejects_short_secret() {
        let err = TokenIssuer::new(b"short", DEFAULT_TOKEN_LIFETIME).unwrap_err();
        assert_eq!(err, TokenError::WeakSecret);
    }

    #[test]
    fn test_rejects_zero_lifetime() {
        let err = TokenIssuer::new(SECRET, Duration::ZERO).unwrap_err();
        assert_eq!(err, TokenError::InvalidLifetime);
    }

    #[test]
    fn test_rejects_lifetime_beyond_max() {
        let err = TokenIssuer::new(SECRET, Duration::from_secs(10_000_000_000_000)).unwrap_err();
        assert_eq!(err, TokenError::InvalidLifetime);

        let err = TokenIssuer::new(SECRET, MAX_TOKEN_LIFETIME + Duration::from_secs(1)).unwrap_err();
        assert_eq!(err, TokenError::InvalidLifetime);

        assert!(TokenIssuer::new(SECRET, MAX_TOKEN_LIFETIME).is_ok());
    }

    #[test]
    fn test_issue_near_end_of_calendar_is_an_error() {
        let issuer = TokenIssuer::new(SECRET, MAX_TOKEN_LIFETIME).unwrap();
        let late = DateTime::<Utc>::MAX_UTC - ChronoDuration::days(1);

        assert_eq!(
            issuer.issue_at("alice", late).unwrap_err(),
            TokenError::InvalidLifetime
        );
    }

    #[test]
    fn test_token_id_is_unique_per_token() {
        let issuer = issuer();
        let a = issuer.verify(&issuer.issue("alice").unwrap()).unwrap();
        let b = issuer.verify(&issuer.issue("alice").unwrap()).unwrap();

        assert!(!a.token_id.is_empty());
        assert_ne!(a.token_id, b.token_id);
    }

    #[test]
    fn test_issue_sets_lifetime() {
        let issuer = issuer();
        let now = Utc::now();
        let token = issuer.issue_at("alice", now).unwrap();
        let verified = issuer.verify_at(&token, now).unwrap();

        assert_eq!(verified.identity, "alice");
        assert_eq!(verified.issued_at.timestamp(), now.timestamp());
        assert_eq!(
            verified.expires_at.timestamp() - verified.issued_at.timestamp(),
            72 * 3600
        );
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let issuer = issuer();
        let now = Utc::now();
        let token = issuer.issue_at("alice", now).unwrap();
        let exp = now + ChronoDuration::hours(72);

        assert!(issuer.verify_at(&token, exp - ChronoDuration::seconds(1)).is_ok());
        assert_eq!(issuer.verify_at(&token, exp), Err(TokenError::Expired));
    }

    #[test]
    fn test_tokens_in_same_second_differ() {
        let issuer = issuer();
        let now = Utc::now();
        let a = issuer.issue_at("alice", now).unwrap();
        let b = issuer.issue_at("alice", now).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_remaining_lifetime_saturates() {
        let issuer = issuer();
        // exp has second precision
        let now = Utc::now().trunc_subsecs(0);
        let token = issuer.issue_at("alice", now).unwrap();
        let verified = issuer.verify_at(&token, now).unwrap();

        assert_eq!(verified.remaining_lifetime(now).as_secs(), 72 * 3600);
        assert_eq!(
            verified.remaining_lifetime(now + ChronoDuration::hours(100)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_wrong_algorithm_rejected() {
        let claims = Claims {
            sub: "alice".into(),
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + 3600,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(issuer().verify(&token), Err(TokenError::WrongAlgorithm));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", issuer());
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("test-secret"));
    }
}
