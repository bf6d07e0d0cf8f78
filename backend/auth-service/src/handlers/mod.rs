/// HTTP request handlers
pub mod auth;
pub mod health;

pub use auth::{authenticated, login, logout, register, CredentialsForm};
pub use health::health_check;
