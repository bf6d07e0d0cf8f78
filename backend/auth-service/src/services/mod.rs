/// Business logic services
pub mod account_service;

pub use account_service::{AccountService, LogoutOutcome};
