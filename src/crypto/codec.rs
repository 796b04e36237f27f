use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{CryptoError, KeyHandle};

/// AES-GCM nonce length (96 bits).
pub const NONCE_LEN: usize = 12;

/// A sealed record: the nonce it was encrypted under plus the ciphertext (with GCM tag).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedRecord {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

/// Serialize `record` to JSON and seal it under `key` with a fresh random nonce.
pub fn encrypt<T: Serialize + ?Sized>(
    record: &T,
    key: &KeyHandle,
) -> Result<EncryptedRecord, CryptoError> {
    let plaintext = serde_json::to_vec(record)?;
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::Encrypt)?;

    // Never cached or reused: one OS-random nonce per call.
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_slice())
        .map_err(|_| CryptoError::Encrypt)?;

    Ok(EncryptedRecord {
        nonce: nonce_bytes.to_vec(),
        ciphertext,
    })
}

/// Open a sealed record. Fails with [`CryptoError::Unreadable`] on a wrong key or
/// any tampering with nonce or ciphertext.
pub fn decrypt<T: DeserializeOwned>(
    record: &EncryptedRecord,
    key: &KeyHandle,
) -> Result<T, CryptoError> {
    if record.nonce.len() != NONCE_LEN {
        return Err(CryptoError::InvalidNonceLength {
            expected: NONCE_LEN,
            actual: record.nonce.len(),
        });
    }

    let cipher =
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::Unreadable)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&record.nonce), record.ciphertext.as_slice())
        .map_err(|_| CryptoError::Unreadable)?;

    serde_json::from_slice(&plaintext).map_err(|_| CryptoError::Unreadable)
}
