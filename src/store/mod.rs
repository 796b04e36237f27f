//! Named persistent collections and the service container that owns them.
//!
//! [`Stores`] is built once at startup over a shared connection and handed to
//! whatever needs storage. It owns one [`EncryptedStore`] per [`Collection`];
//! [`Stores::unlock`] derives the user's key once and binds it to every
//! encrypted collection.

pub mod encrypted;

pub use encrypted::EncryptedStore;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::crypto::{self, CryptoError, EncryptedRecord, KeyHandle, SALT_LEN};

/// The logical collections persisted by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Account records and per-user salts. Never encrypted.
    Users,
    Settings,
    Journals,
    Chats,
    Analysis,
    Assessments,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Self::Users,
        Self::Settings,
        Self::Journals,
        Self::Chats,
        Self::Analysis,
        Self::Assessments,
    ];

    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Settings => "settings",
            Self::Journals => "journals",
            Self::Chats => "chats",
            Self::Analysis => "analysis",
            Self::Assessments => "assessments",
        }
    }

    /// Whether values in this collection are sealed before being written.
    pub fn encrypted_by_default(&self) -> bool {
        !matches!(self, Self::Users)
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown collection: {s}"))
    }
}

/// A persisted value, tagged at write time as plaintext or sealed.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredRecord {
    Plain(serde_json::Value),
    Encrypted(EncryptedRecord),
}

impl StoredRecord {
    /// Value of the `kind` column.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Plain(_) => "plain",
            Self::Encrypted(_) => "encrypted",
        }
    }
}

/// Key in the users collection under which a user's salt is kept.
pub fn salt_key(username: &str) -> String {
    format!("salt:{username}")
}

/// Key in the users collection holding a sealed marker that proves a
/// passphrase matches the one the user's records were sealed under.
pub fn key_check_key(username: &str) -> String {
    format!("keycheck:{username}")
}

const KEY_CHECK_MARKER: &str = "solace-key-check";

/// One store per collection over a single shared connection.
pub struct Stores {
    db: Arc<Mutex<Connection>>,
    pub users: Arc<EncryptedStore>,
    pub settings: Arc<EncryptedStore>,
    pub journals: Arc<EncryptedStore>,
    pub chats: Arc<EncryptedStore>,
    pub analysis: Arc<EncryptedStore>,
    pub assessments: Arc<EncryptedStore>,
}

impl Stores {
    pub fn new(conn: Connection) -> Self {
        Self::from_shared(Arc::new(Mutex::new(conn)))
    }

    pub fn from_shared(db: Arc<Mutex<Connection>>) -> Self {
        let make = |collection: Collection| {
            Arc::new(EncryptedStore::new(
                Arc::clone(&db),
                collection,
                collection.encrypted_by_default(),
            ))
        };
        Self {
            users: make(Collection::Users),
            settings: make(Collection::Settings),
            journals: make(Collection::Journals),
            chats: make(Collection::Chats),
            analysis: make(Collection::Analysis),
            assessments: make(Collection::Assessments),
            db,
        }
    }

    /// The shared connection, for diagnostics that bypass the collections.
    pub fn db(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.db)
    }

    pub fn get(&self, collection: Collection) -> &Arc<EncryptedStore> {
        match collection {
            Collection::Users => &self.users,
            Collection::Settings => &self.settings,
            Collection::Journals => &self.journals,
            Collection::Chats => &self.chats,
            Collection::Analysis => &self.analysis,
            Collection::Assessments => &self.assessments,
        }
    }

    fn encrypted_stores(&self) -> impl Iterator<Item = &Arc<EncryptedStore>> {
        Collection::ALL
            .iter()
            .map(|c| self.get(*c))
            .filter(|s| s.is_encrypted())
    }

    /// Load the user's salt, creating and persisting it on first use.
    ///
    /// The salt never changes once written; replacing it would orphan every
    /// encrypted record for that user.
    pub fn load_or_create_salt(&self, username: &str) -> Result<[u8; SALT_LEN]> {
        if username.is_empty() {
            bail!("username must not be empty");
        }

        let key = salt_key(username);
        if let Some(encoded) = self.users.get::<String>(&key) {
            let bytes = BASE64
                .decode(encoded.as_bytes())
                .with_context(|| format!("stored salt for {username} is not valid base64"))?;
            let salt: [u8; SALT_LEN] = bytes.as_slice().try_into().with_context(|| {
                format!("stored salt for {username} has length {}", bytes.len())
            })?;
            return Ok(salt);
        }

        let salt = crypto::generate_salt();
        if !self.users.save(&key, &BASE64.encode(salt)) {
            bail!("failed to persist salt for {username}");
        }
        tracing::info!(user = username, "created salt for new user");
        Ok(salt)
    }

    /// Derive the user's key and bind it to every encrypted collection.
    ///
    /// The first unlock records a sealed marker in `users`; later unlocks
    /// must open it or fail with [`CryptoError::WrongSecret`], leaving the
    /// current binding untouched.
    pub fn unlock(&self, username: &str, secret: &str) -> Result<()> {
        if secret.is_empty() {
            return Err(CryptoError::EmptySecret.into());
        }
        let salt = self.load_or_create_salt(username)?;
        let key = crypto::derive_key(secret, &salt)?;
        self.check_or_record_key(username, &key)?;
        self.bind_key(Arc::new(key));
        tracing::info!(user = username, "stores unlocked");
        Ok(())
    }

    fn check_or_record_key(&self, username: &str, key: &KeyHandle) -> Result<()> {
        let check_key = key_check_key(username);
        match self.users.get::<EncryptedRecord>(&check_key) {
            Some(sealed) => match crypto::decrypt::<String>(&sealed, key) {
                Ok(marker) if marker == KEY_CHECK_MARKER => Ok(()),
                _ => {
                    tracing::warn!(user = username, "unlock rejected: passphrase does not match");
                    Err(CryptoError::WrongSecret.into())
                }
            },
            None => {
                let sealed = crypto::encrypt(KEY_CHECK_MARKER, key)?;
                if !self.users.save(&check_key, &sealed) {
                    bail!("failed to persist key check for {username}");
                }
                Ok(())
            }
        }
    }

    pub fn bind_key(&self, key: Arc<KeyHandle>) {
        for store in self.encrypted_stores() {
            store.bind_key(Arc::clone(&key));
        }
    }

    /// Drop the key handle from every collection.
    pub fn lock(&self) {
        for store in self.encrypted_stores() {
            store.clear_encryption_key();
        }
        tracing::info!("stores locked");
    }

    pub fn is_unlocked(&self) -> bool {
        self.encrypted_stores().all(|s| s.has_key())
    }
}
