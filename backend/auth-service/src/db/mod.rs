pub mod users;

pub use users::{CredentialStore, InMemoryCredentialStore, PgCredentialStore, StoreError};
