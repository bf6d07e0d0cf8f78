/// Security module for authentication
/// Provides password hashing, token revocation and the request authenticator

// Re-export token issuing from shared crypto-core library
pub use crypto_core::jwt::{TokenError, TokenIssuer, VerifiedToken};

pub mod authenticator;
pub mod password;
pub mod token_revocation;

pub use authenticator::{extract_bearer, AuthOutcome, Authenticator, Rejection};
pub use password::{PasswordError, PasswordHasher};
pub use token_revocation::{
    InMemoryRevocationRegistry, RedisRevocationRegistry, RegistryError, RevocationRegistry,
};
