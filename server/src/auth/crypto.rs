use std::sync::LazyLock;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes per session token, hex encoded on the wire.
const TOKEN_BYTES: usize = 32;

/// Set INSECURE_PASSWORD_HASHING to trade hash strength for speed in
/// dev and test runs.
static FAST_HASHING: LazyLock<bool> =
    LazyLock::new(|| std::env::var_os("INSECURE_PASSWORD_HASHING").is_some());

pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Sessions are looked up by this digest; the raw token is never stored.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn hasher() -> Argon2<'static> {
    if !*FAST_HASHING {
        return Argon2::default();
    }
    // 1 MiB, one pass, one lane: NOT for production
    Params::new(1024, 1, 1, None)
        .map(|params| Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
        .unwrap_or_default()
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(hasher()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// False for a wrong password and for stored values that are not PHC
/// hashes (such as the `!` placeholder).
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored).is_ok_and(|parsed| {
        hasher()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}
