use chrono::{DateTime, Utc};
/// Account model
use sqlx::FromRow;
use std::fmt;

/// A registered identity and its password hash.
///
/// Identity is the primary key and is compared byte for byte.
#[derive(Clone, FromRow)]
pub struct Account {
    pub identity: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("identity", &self.identity)
            .field("password_hash", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish()
    }
}
