use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use super::CryptoError;

/// PBKDF2 round count. Changing it invalidates every encrypted record.
pub const KDF_ITERATIONS: u32 = 100_000;
/// Derived key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;
/// Per-user salt length in bytes.
pub const SALT_LEN: usize = 16;

/// Identifier recorded in `schema_meta` for the derivation in use.
pub fn kdf_id() -> String {
    format!("pbkdf2-sha256:{KDF_ITERATIONS}")
}

/// A derived symmetric key. Lives only in memory; never serialized.
pub struct KeyHandle([u8; KEY_LEN]);

impl KeyHandle {
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyHandle(<redacted>)")
    }
}

impl Drop for KeyHandle {
    fn drop(&mut self) {
        self.0.fill(0);
    }
}

/// Derive a key handle from a secret and salt with PBKDF2-HMAC-SHA256.
///
/// Deterministic: the same `(secret, salt)` always yields the same key.
pub fn derive_key(secret: &str, salt: &[u8]) -> Result<KeyHandle, CryptoError> {
    if secret.is_empty() {
        return Err(CryptoError::EmptySecret);
    }
    if salt.len() != SALT_LEN {
        return Err(CryptoError::InvalidSaltLength {
            expected: SALT_LEN,
            actual: salt.len(),
        });
    }

    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt, KDF_ITERATIONS, &mut key);
    Ok(KeyHandle(key))
}

/// Generate a fresh random salt from the OS CSPRNG.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}
