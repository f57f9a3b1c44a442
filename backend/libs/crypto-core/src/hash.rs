use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Compute SHA256 hash of input bytes
pub fn sha256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hasher.finalize().into()
}

/// SHA256 of a UTF-8 string, lowercase hex encoded
///
/// Reset tokens are persisted in this form so a leaked row cannot be
/// replayed as a reset link.
pub fn sha256_hex(input: &str) -> String {
    hex::encode(sha256(input.as_bytes()))
}

/// Generate `len` random bytes from the OS RNG and hex encode them
pub fn random_token_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
