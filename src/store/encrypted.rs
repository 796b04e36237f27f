//! A single named collection with optional transparent encryption.
//!
//! Every public operation converts storage and crypto failures into
//! `false`/`None`/empty results after logging them. Callers never see raw
//! I/O errors and may safely retry.

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use super::{Collection, StoredRecord};
use crate::crypto::{self, CryptoError, EncryptedRecord, KeyHandle};

/// Key/value operations over one collection in the shared database.
pub struct EncryptedStore {
    db: Arc<Mutex<Connection>>,
    collection: Collection,
    encrypted: bool,
    key: RwLock<Option<Arc<KeyHandle>>>,
}

impl EncryptedStore {
    /// Build a store for `collection`. `encrypted` decides whether `save` seals values.
    pub fn new(db: Arc<Mutex<Connection>>, collection: Collection, encrypted: bool) -> Self {
        Self {
            db,
            collection,
            encrypted,
            key: RwLock::new(None),
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Derive a key from `secret` and `salt` and bind it to this store.
    pub fn set_encryption_key(&self, secret: &str, salt: &[u8]) -> Result<(), CryptoError> {
        let key = crypto::derive_key(secret, salt)?;
        self.bind_key(Arc::new(key));
        Ok(())
    }

    /// Bind an already-derived key (shared across collections by [`Stores`](super::Stores)).
    pub fn bind_key(&self, key: Arc<KeyHandle>) {
        if let Ok(mut slot) = self.key.write() {
            *slot = Some(key);
        }
    }

    pub fn clear_encryption_key(&self) {
        if let Ok(mut slot) = self.key.write() {
            *slot = None;
        }
    }

    pub fn has_key(&self) -> bool {
        self.current_key().is_some()
    }

    /// Write `value` at `key`, overwriting any existing record.
    ///
    /// Returns `false` if the write failed, or if the collection is encrypted but
    /// no key is bound (plaintext is never written to an encrypted collection).
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match self.try_save(key, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(collection = %self.collection, key, error = %e, "save failed");
                false
            }
        }
    }

    /// Read the value at `key`. `None` if absent, unreadable, or the store failed.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let record = match self.read_record(key) {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(collection = %self.collection, key, error = %e, "read failed");
                return None;
            }
        };
        self.open_record(key, record)
    }

    /// Delete the record at `key`. Deleting a missing key succeeds.
    pub fn remove(&self, key: &str) -> bool {
        let result = self.conn().and_then(|conn| {
            conn.execute(
                "DELETE FROM records WHERE collection = ?1 AND key = ?2",
                params![self.collection.as_str(), key],
            )
            .context("delete failed")
        });
        match result {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(collection = %self.collection, key, error = %e, "remove failed");
                false
            }
        }
    }

    /// Delete every record in this collection.
    pub fn clear(&self) -> bool {
        let result = self.conn().and_then(|conn| {
            conn.execute(
                "DELETE FROM records WHERE collection = ?1",
                params![self.collection.as_str()],
            )
            .context("clear failed")
        });
        match result {
            Ok(removed) => {
                tracing::info!(collection = %self.collection, removed, "collection cleared");
                true
            }
            Err(e) => {
                tracing::warn!(collection = %self.collection, error = %e, "clear failed");
                false
            }
        }
    }

    /// All keys in this collection, in key order.
    pub fn keys(&self) -> Vec<String> {
        let result = self.conn().and_then(|conn| {
            let mut stmt =
                conn.prepare("SELECT key FROM records WHERE collection = ?1 ORDER BY key")?;
            let keys = stmt
                .query_map(params![self.collection.as_str()], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(keys)
        });
        result.unwrap_or_else(|e| {
            tracing::warn!(collection = %self.collection, error = %e, "listing keys failed");
            Vec::new()
        })
    }

    /// Every readable `(key, value)` pair. Unreadable records are skipped.
    pub fn get_all<T: DeserializeOwned>(&self) -> Vec<(String, T)> {
        let rows = match self.read_all_records() {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(collection = %self.collection, error = %e, "read all failed");
                return Vec::new();
            }
        };
        rows.into_iter()
            .filter_map(|(key, record)| {
                let value = self.open_record(&key, record)?;
                Some((key, value))
            })
            .collect()
    }

    /// Read the raw tagged record at `key` without decoding it.
    pub fn get_raw(&self, key: &str) -> Option<StoredRecord> {
        self.read_record(key).ok().flatten()
    }

    // ── internals ────────────────────────────────────────────────────────────

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| anyhow!("database mutex poisoned"))
    }

    fn current_key(&self) -> Option<Arc<KeyHandle>> {
        self.key.read().ok().and_then(|slot| slot.clone())
    }

    fn try_save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let record = if self.encrypted {
            let handle = self
                .current_key()
                .ok_or_else(|| anyhow!("collection is encrypted but no key is bound"))?;
            StoredRecord::Encrypted(crypto::encrypt(value, &handle)?)
        } else {
            StoredRecord::Plain(serde_json::to_value(value)?)
        };
        self.write_record(key, &record)
    }

    fn write_record(&self, key: &str, record: &StoredRecord) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let (payload, nonce): (Vec<u8>, Option<&[u8]>) = match record {
            StoredRecord::Plain(value) => (serde_json::to_vec(value)?, None),
            StoredRecord::Encrypted(sealed) => {
                (sealed.ciphertext.clone(), Some(sealed.nonce.as_slice()))
            }
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO records (collection, key, kind, payload, nonce, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                self.collection.as_str(),
                key,
                record.kind(),
                payload,
                nonce,
                now
            ],
        )
        .context("write failed")?;
        Ok(())
    }

    fn read_record(&self, key: &str) -> Result<Option<StoredRecord>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT kind, payload, nonce FROM records WHERE collection = ?1 AND key = ?2",
                params![self.collection.as_str(), key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, Option<Vec<u8>>>(2)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(kind, payload, nonce)| decode_row(&kind, payload, nonce))
            .transpose()
    }

    fn read_all_records(&self) -> Result<Vec<(String, StoredRecord)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT key, kind, payload, nonce FROM records WHERE collection = ?1 ORDER BY key",
        )?;
        let rows = stmt
            .query_map(params![self.collection.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, Option<Vec<u8>>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(key, kind, payload, nonce)| match decode_row(&kind, payload, nonce) {
                Ok(record) => Some((key, record)),
                Err(e) => {
                    tracing::warn!(collection = %self.collection, key = %key, error = %e, "skipping malformed record");
                    None
                }
            })
            .collect())
    }

    fn open_record<T: DeserializeOwned>(&self, key: &str, record: StoredRecord) -> Option<T> {
        match record {
            StoredRecord::Plain(value) => match serde_json::from_value(value) {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!(collection = %self.collection, key, error = %e, "plain record has unexpected shape");
                    None
                }
            },
            StoredRecord::Encrypted(sealed) => {
                let Some(handle) = self.current_key() else {
                    tracing::debug!(collection = %self.collection, key, "encrypted record but no key bound");
                    return None;
                };
                match crypto::decrypt(&sealed, &handle) {
                    Ok(v) => Some(v),
                    Err(e) => {
                        tracing::warn!(collection = %self.collection, key, error = %e, "record unreadable");
                        None
                    }
                }
            }
        }
    }
}

fn decode_row(kind: &str, payload: Vec<u8>, nonce: Option<Vec<u8>>) -> Result<StoredRecord> {
    match (kind, nonce) {
        ("plain", _) => Ok(StoredRecord::Plain(serde_json::from_slice(&payload)?)),
        ("encrypted", Some(nonce)) => Ok(StoredRecord::Encrypted(EncryptedRecord {
            nonce,
            ciphertext: payload,
        })),
        (other, _) => Err(anyhow!("malformed record row (kind = {other})")),
    }
}
