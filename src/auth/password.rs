//! Password hashing.
//!
//! Stored hashes are unsalted SHA-1 hex digests so existing account data
//! keeps working.

use sha1::{Digest, Sha1};

/// Hash a password into its stored form (40 lowercase hex characters).
pub fn hash_password(password: &str) -> String {
    let digest = Sha1::digest(password.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Check a plaintext password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    hash_password(password) == hash
}
