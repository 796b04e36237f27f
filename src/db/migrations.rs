//! Versioned upgrades of the on-disk layout.
//!
//! `schema_meta` doubles as a small key/value table: `schema_version` plus
//! the `kdf` id that sealed rows were written under. Each step in
//! [`MIGRATIONS`] moves the database up exactly one version inside its own
//! transaction.

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::crypto;

pub const CURRENT_SCHEMA_VERSION: u32 = 2;

const VERSION_KEY: &str = "schema_version";
const KDF_KEY: &str = "kdf";

type Step = fn(&Transaction<'_>) -> Result<()>;

/// `(target version, step)`, in ascending order.
const MIGRATIONS: &[(u32, Step)] = &[(2, record_kdf)];

fn read_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .with_context(|| format!("failed to read schema_meta.{key}"))
}

fn write_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_meta (key, value) VALUES (?1, ?2)",
        params![key, value],
    )
    .with_context(|| format!("failed to write schema_meta.{key}"))?;
    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<u32> {
    let raw = read_meta(conn, VERSION_KEY)?.context("schema_version missing")?;
    raw.parse()
        .with_context(|| format!("schema_version is not a number: {raw:?}"))
}

/// Key derivation that sealed rows were written under, if recorded.
pub fn get_kdf_id(conn: &Connection) -> Result<Option<String>> {
    read_meta(conn, KDF_KEY)
}

pub fn set_kdf_id(conn: &Connection, kdf: &str) -> Result<()> {
    write_meta(conn, KDF_KEY, kdf)
}

/// Bring the database up to [`CURRENT_SCHEMA_VERSION`].
///
/// A database written by a newer build is refused rather than touched.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let start = get_schema_version(conn)?;
    if start > CURRENT_SCHEMA_VERSION {
        bail!("database schema v{start} is newer than this build (v{CURRENT_SCHEMA_VERSION})");
    }

    for &(target, step) in MIGRATIONS.iter().filter(|(target, _)| *target > start) {
        tracing::info!(from = target - 1, to = target, "migrating schema");
        let tx = conn.transaction()?;
        step(&tx).with_context(|| format!("migration to v{target} failed"))?;
        write_meta(&tx, VERSION_KEY, &target.to_string())?;
        tx.commit()?;
    }

    Ok(())
}

/// v2: remember which derivation sealed existing rows so `doctor` can flag a change.
fn record_kdf(tx: &Transaction<'_>) -> Result<()> {
    if get_kdf_id(tx)?.is_none() {
        set_kdf_id(tx, &crypto::kdf_id())?;
    }
    Ok(())
}
