use sha2::{Digest, Sha256};

/// Compute SHA256 hash of input bytes
pub fn sha256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hasher.finalize().into()
}

/// Hex-encoded SHA256 of a bearer token.
///
/// Used as the storage key wherever a token has to be remembered, so the
/// raw credential never lands in Redis or logs.
pub fn token_fingerprint(token: &str) -> String {
    hex::encode(sha256(token.as_bytes()))
}
