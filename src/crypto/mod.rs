//! Password-based key derivation and authenticated record encryption.
//!
//! [`derive_key`] turns a user secret plus a stored random salt into a
//! [`KeyHandle`]; [`encrypt`] and [`decrypt`] seal and open a single
//! serde-serializable record with AES-256-GCM under that handle.

pub mod codec;
pub mod kdf;

pub use codec::{decrypt, encrypt, EncryptedRecord, NONCE_LEN};
pub use kdf::{derive_key, generate_salt, kdf_id, KeyHandle, KDF_ITERATIONS, KEY_LEN, SALT_LEN};

/// Errors raised by key derivation and the authenticated codec.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("secret must not be empty")]
    EmptySecret,
    #[error("salt must be {expected} bytes, got {actual}")]
    InvalidSaltLength { expected: usize, actual: usize },
    #[error("nonce must be {expected} bytes, got {actual}")]
    InvalidNonceLength { expected: usize, actual: usize },
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("secret does not match this user's key")]
    WrongSecret,
    #[error("encryption failed")]
    Encrypt,
    /// Wrong key, tampered ciphertext, or a payload that no longer matches the record type.
    #[error("record unreadable")]
    Unreadable,
}
