use sha2::{Digest, Sha512};

/// Compute the CRAM response for a `from` challenge
///
/// Lowercase hex of `SHA-512(secret || challenge)`.
pub fn cram_digest(secret: &str, challenge: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(secret.as_bytes());
    hasher.update(challenge.as_bytes());
    hex::encode(hasher.finalize())
}
