/// Password hashing and verification using Argon2id
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// The stored value is not a usable PHC string. This is data corruption,
    /// never a wrong password.
    #[error("stored password hash is malformed: {0}")]
    CorruptHash(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("invalid argon2 parameters: {0}")]
    InvalidParams(String),
}

/// Salted, tunable Argon2id hasher.
///
/// Both operations are CPU bound; async callers should run them on the
/// blocking pool.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("memory_kib", &self.params.m_cost())
            .field("iterations", &self.params.t_cost())
            .field("parallelism", &self.params.p_cost())
            .finish()
    }
}

impl PasswordHasher {
    /// Build a hasher with an explicit work factor.
    ///
    /// ## Errors
    ///
    /// [`PasswordError::InvalidParams`] if argon2 rejects the combination
    /// (e.g. memory below `8 * parallelism` KiB).
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh random salt.
    ///
    /// Returns a PHC-formatted string safe for storage.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::Hashing(e.to_string()))
    }

    /// Verify a password against a stored PHC string.
    ///
    /// The comparison itself is constant-time. Parameters are taken from the
    /// stored string, so hashes made under an older work factor still verify.
    pub fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| PasswordError::CorruptHash(e.to_string()))?;

        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::CorruptHash(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(1024, 1, 1).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let hash = hasher.hash("secret123").unwrap();
        assert!(hasher.verify("secret123", &hash).unwrap());
    }

    #[test]
    fn test_wrong_password() {
        let hasher = hasher();
        let hash = hasher.hash("secret123").unwrap();
        assert!(!hasher.verify("wrongpassword", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = hasher();
        let a = hasher.hash("secret123").unwrap();
        let b = hasher.hash("secret123").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
    }

    #[test]
    fn test_corrupt_hash_is_not_a_mismatch() {
        let err = hasher().verify("secret123", "not-a-phc-string").unwrap_err();
        assert!(matches!(err, PasswordError::CorruptHash(_)));
    }

    #[test]
    fn test_plain_digest_is_rejected_as_corrupt() {
        let err = hasher()
            .verify(
                "secret123",
                "fcf730b6d95236ecd3c9fc2d92d7b6b2bb061514961aec041d6c7a7192f592e4",
            )
            .unwrap_err();
        assert!(matches!(err, PasswordError::CorruptHash(_)));
    }

    #[test]
    fn test_older_work_factor_still_verifies() {
        let old = PasswordHasher::new(2048, 2, 1).unwrap();
        let hash = old.hash("secret123").unwrap();
        assert!(hasher().verify("secret123", &hash).unwrap());
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(matches!(
            PasswordHasher::new(1, 0, 0),
            Err(PasswordError::InvalidParams(_))
        ));
    }
}
