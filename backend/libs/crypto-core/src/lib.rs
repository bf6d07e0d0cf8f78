//! Shared cryptographic primitives for the auth services.
//!
//! - [`jwt`]: HS256 bearer token issuing and verification
//! - [`hash`]: SHA-256 helpers used to fingerprint bearer tokens

pub mod hash;
pub mod jwt;

pub use jwt::{Claims, TokenError, TokenIssuer, VerifiedToken};
