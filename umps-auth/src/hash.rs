//! Password hashing and constant-time comparison helpers shared by the authenticator backends.

use argon2::Argon2;
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use subtle::ConstantTimeEq;

use umps_base::error::{Error, Result};

/// Maximum length of a stored password hash (spec §3 "User").
pub const MAX_HASH: usize = 256;

/// Length of a stored public-key hash (spec §3 "User": `hashed_public_key` length = `KEY_LEN`).
pub const KEY_LEN: usize = super::keypair::KEY_LEN;

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|error| Error::algorithm_failure(format!("argon2 hash: {error}")))?
        .to_string();
    if hash.len() > MAX_HASH {
        return Err(Error::algorithm_failure("password hash exceeds MAX_HASH"));
    }
    Ok(hash)
}

/// Verifies `password` against a stored Argon2 PHC hash. Returns `false` (not an error) on any
/// malformed hash or mismatch; only infrastructure failures are errors.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Encodes a public key for storage as lowercase hex, to be compared in constant time.
pub fn encode_public_key(public_key: &[u8; KEY_LEN]) -> String {
    hex_encode(public_key)
}

/// Compares a presented public key against its stored hex encoding in constant time.
pub fn verify_public_key(public_key: &[u8; KEY_LEN], stored_hex: &str) -> bool {
    let Ok(stored) = hex_decode(stored_hex) else {
        return false;
    };
    if stored.len() != KEY_LEN {
        return false;
    }
    public_key.ct_eq(&stored[..]).into()
}

/// Compares two passwords/secrets in constant time, for callers that already hold cleartext on
/// both sides (e.g. PLAIN mechanism comparisons against a fixed-format secret).
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn hex_decode(text: &str) -> Result<Vec<u8>> {
    if text.len() % 2 != 0 {
        return Err(Error::invalid_argument("odd-length hex string"));
    }
    (0..text.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&text[i..i + 2], 16)
                .map_err(|_| Error::invalid_argument("invalid hex digit"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn public_key_round_trip() {
        let key = [7u8; KEY_LEN];
        let stored = encode_public_key(&key);
        assert!(verify_public_key(&key, &stored));
        assert!(!verify_public_key(&[8u8; KEY_LEN], &stored));
    }
}
