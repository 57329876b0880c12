//! Password digests and session tokens.
//!
//! Passwords are stored as `base64(SHA-256(salt ‖ password))` next to a random
//! per-customer salt and compared in constant time.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};

const SALT_BYTES: usize = 16;
const TOKEN_BYTES: usize = 32;

/// A stored password: digest and the salt it was computed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordDigest {
    /// `base64(SHA-256(salt ‖ password))`
    pub hash: String,
    /// base64 salt
    pub salt: String,
}

/// Hash `password` under a fresh random salt.
#[must_use]
pub fn hash_password(password: &str) -> PasswordDigest {
    let mut salt = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = STANDARD.encode(salt);

    PasswordDigest {
        hash: digest(&salt, password),
        salt,
    }
}

/// Whether `password` matches the stored digest.
#[must_use]
pub fn verify_password(password: &str, hash: &str, salt: &str) -> bool {
    constant_time_eq::constant_time_eq(digest(salt, password).as_bytes(), hash.as_bytes())
}

/// A random, URL-safe session token.
#[must_use]
pub fn session_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    STANDARD.encode(hasher.finalize())
}
