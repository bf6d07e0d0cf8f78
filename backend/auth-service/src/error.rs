use actix_web::{
    http::{header, StatusCode},
    HttpResponse, ResponseError,
};
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;
use crate::security::authenticator::Rejection;
use crate::security::password::PasswordError;
use crate::security::token_revocation::RegistryError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Identity already registered")]
    AlreadyExists,

    /// Unknown identity and wrong password are deliberately the same variant
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthenticated: {0}")]
    Unauthenticated(Rejection),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Stored credential is corrupt: {0}")]
    CorruptCredential(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;

impl AuthError {
    /// Message safe to hand to clients; never carries internal detail.
    fn public_message(&self) -> String {
        match self {
            AuthError::InvalidInput(msg) => msg.clone(),
            AuthError::AlreadyExists => "Identity already registered".to_string(),
            AuthError::InvalidCredentials => "Invalid credentials".to_string(),
            AuthError::Unauthenticated(_) => "Invalid token".to_string(),
            AuthError::StoreUnavailable(_)
            | AuthError::CorruptCredential(_)
            | AuthError::Internal(_)
            | AuthError::Configuration(_) => "Internal server error".to_string(),
        }
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AuthError::AlreadyExists => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::Unauthenticated(_) => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::StoreUnavailable(_)
            | AuthError::CorruptCredential(_)
            | AuthError::Internal(_)
            | AuthError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let mut builder = HttpResponse::build(status);
        if let AuthError::Unauthenticated(_) = self {
            builder.insert_header((header::WWW_AUTHENTICATE, "Bearer"));
        }

        builder.json(json!({
            "error": self.public_message(),
            "status": status.as_u16()
        }))
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists => AuthError::AlreadyExists,
            StoreError::NotFound => AuthError::InvalidCredentials,
            StoreError::Unavailable(msg) => AuthError::StoreUnavailable(msg),
        }
    }
}

impl From<RegistryError> for AuthError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Unavailable(msg) => AuthError::StoreUnavailable(msg),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::CorruptHash(msg) => AuthError::CorruptCredential(msg),
            PasswordError::Hashing(msg) | PasswordError::InvalidParams(msg) => {
                AuthError::Internal(msg)
            }
        }
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!("blocking task failed: {}", err);
        AuthError::Internal(err.to_string())
    }
}
