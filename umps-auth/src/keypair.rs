//! Curve-style key material and plain credentials (spec §3 "Keys", §4.1 C1).

use umps_base::error::{Error, Result};

/// Length in bytes of a Curve public or private key.
pub const KEY_LEN: usize = 32;

/// A Curve keypair: binary keys plus their Z85 textual form.
///
/// Invariants: if a textual field is set, it decodes to the matching binary field; `create`
/// populates both representations together, never one without the other.
#[derive(Clone, Eq, PartialEq)]
pub struct KeyPair {
    public_key: [u8; KEY_LEN],
    public_key_text: String,
    private_key: Option<[u8; KEY_LEN]>,
    private_key_text: Option<String>,
    name: String,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key_text", &self.public_key_text)
            .field("has_private_key", &self.private_key.is_some())
            .field("name", &self.name)
            .finish()
    }
}

impl KeyPair {
    /// Generates a fresh Curve keypair (both binary and Z85 forms populated atomically).
    pub fn create(name: impl Into<String>) -> Result<Self> {
        let pair = zmq::CurveKeyPair::new()
            .map_err(|error| Error::algorithm_failure(format!("curve keygen: {error}")))?;
        let public_key = pair.public_key;
        let private_key = pair.secret_key;
        let public_key_text = z85_encode(&public_key)?;
        let private_key_text = z85_encode(&private_key)?;
        Ok(Self {
            public_key,
            public_key_text,
            private_key: Some(private_key),
            private_key_text: Some(private_key_text),
            name: name.into(),
        })
    }

    /// Builds a keypair from a binary public key only (no private key, e.g. a server's known
    /// public key held by a client).
    pub fn from_public_key(public_key: [u8; KEY_LEN], name: impl Into<String>) -> Result<Self> {
        let public_key_text = z85_encode(&public_key)?;
        Ok(Self {
            public_key,
            public_key_text,
            private_key: None,
            private_key_text: None,
            name: name.into(),
        })
    }

    /// Builds a complete keypair from its two binary halves.
    pub fn from_keys(
        public_key: [u8; KEY_LEN],
        private_key: [u8; KEY_LEN],
        name: impl Into<String>,
    ) -> Result<Self> {
        let public_key_text = z85_encode(&public_key)?;
        let private_key_text = z85_encode(&private_key)?;
        Ok(Self {
            public_key,
            public_key_text,
            private_key: Some(private_key),
            private_key_text: Some(private_key_text),
            name: name.into(),
        })
    }

    /// Builds a keypair from the Z85 textual forms, verifying they decode to 32 bytes each.
    pub fn from_text(
        public_key_text: impl Into<String>,
        private_key_text: Option<String>,
        name: impl Into<String>,
    ) -> Result<Self> {
        let public_key_text = public_key_text.into();
        let public_key = z85_decode(&public_key_text)?;
        let (private_key, private_key_text) = match private_key_text {
            Some(text) => (Some(z85_decode(&text)?), Some(text)),
            None => (None, None),
        };
        Ok(Self {
            public_key,
            public_key_text,
            private_key,
            private_key_text,
            name: name.into(),
        })
    }

    pub fn public_key(&self) -> &[u8; KEY_LEN] {
        &self.public_key
    }

    pub fn public_key_text(&self) -> &str {
        &self.public_key_text
    }

    pub fn private_key(&self) -> Option<&[u8; KEY_LEN]> {
        self.private_key.as_ref()
    }

    pub fn private_key_text(&self) -> Option<&str> {
        self.private_key_text.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    /// Writes the keypair to `public_key_path` and, if present, `private_key_path`: each file
    /// holds the Z85 text on its first line and `# <name>` on a second line (spec §6 `ukeypair`).
    pub fn to_files(
        &self,
        public_key_path: impl AsRef<std::path::Path>,
        private_key_path: impl AsRef<std::path::Path>,
    ) -> Result<()> {
        std::fs::write(
            public_key_path,
            format!("{}\n# {}\n", self.public_key_text, self.name),
        )
        .map_err(|error| Error::io_failure(error.to_string()))?;
        if let Some(private_key_text) = &self.private_key_text {
            std::fs::write(private_key_path, format!("{private_key_text}\n# {}\n", self.name))
                .map_err(|error| Error::io_failure(error.to_string()))?;
        }
        Ok(())
    }
}

// Z85 (ZeroMQ RFC 32) textual encoding: every 4 bytes become 5 printable characters, so a
// 32-byte Curve key becomes exactly 40 characters (41 with the C-style NUL terminator spec §3
// describes; we store it here without one since Rust strings aren't NUL-terminated).
const Z85_ALPHABET: &[u8; 85] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ.-:+=^!/*?&<>()[]{}@%$#";

fn z85_encode(key: &[u8; KEY_LEN]) -> Result<String> {
    if KEY_LEN % 4 != 0 {
        return Err(Error::algorithm_failure("z85 requires a length multiple of 4"));
    }
    let mut out = String::with_capacity(KEY_LEN / 4 * 5);
    for chunk in key.chunks_exact(4) {
        let mut value = u32::from_be_bytes(chunk.try_into().expect("4 bytes"));
        let mut digits = [0u8; 5];
        for digit in digits.iter_mut().rev() {
            *digit = Z85_ALPHABET[(value % 85) as usize];
            value /= 85;
        }
        out.push_str(std::str::from_utf8(&digits).expect("ascii"));
    }
    Ok(out)
}

fn z85_decode(text: &str) -> Result<[u8; KEY_LEN]> {
    if text.len() != KEY_LEN / 4 * 5 {
        return Err(Error::invalid_argument(format!(
            "z85 text must be {} characters, got {}",
            KEY_LEN / 4 * 5,
            text.len()
        )));
    }
    let bytes = text.as_bytes();
    let mut out = [0u8; KEY_LEN];
    for (chunk_index, chunk) in bytes.chunks_exact(5).enumerate() {
        let mut value: u32 = 0;
        for &ch in chunk {
            let digit = Z85_ALPHABET
                .iter()
                .position(|&c| c == ch)
                .ok_or_else(|| Error::invalid_argument("invalid z85 character"))?;
            value = value
                .checked_mul(85)
                .and_then(|v| v.checked_add(digit as u32))
                .ok_or_else(|| Error::invalid_argument("z85 chunk overflows 32 bits"))?;
        }
        out[chunk_index * 4..chunk_index * 4 + 4].copy_from_slice(&value.to_be_bytes());
    }
    Ok(out)
}

/// A username/password credential (spec §3 "Keys").
#[derive(Clone, Eq, PartialEq)]
pub struct UsernameAndPassword {
    username: String,
    password: String,
}

impl std::fmt::Debug for UsernameAndPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsernameAndPassword")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl UsernameAndPassword {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Hashes the cleartext password with Argon2, producing a PHC string suitable for storage.
    pub fn hash_password(&self) -> Result<String> {
        super::hash::hash_password(&self.password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_round_trips_through_text() {
        let keys = KeyPair::create("test").unwrap();
        let decoded = KeyPair::from_text(
            keys.public_key_text().to_string(),
            keys.private_key_text().map(str::to_string),
            "decoded",
        )
        .unwrap();
        assert_eq!(decoded.public_key(), keys.public_key());
        assert_eq!(decoded.private_key(), keys.private_key());
    }

    #[test]
    fn from_text_rejects_garbage() {
        assert!(KeyPair::from_text("not-z85!!", None, "bad").is_err());
    }
}
