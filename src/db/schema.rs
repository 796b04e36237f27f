//! SQL DDL for all Solace tables.
//!
//! Defines the `records` table (every named collection shares it, keyed by
//! `(collection, key)`) and `schema_meta`. All DDL uses `IF NOT EXISTS` for
//! idempotent initialization.

use rusqlite::Connection;

/// All schema DDL statements.
const SCHEMA_SQL: &str = r#"
-- One row per (collection, key). `kind` is the explicit plain/encrypted tag.
CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL,
    key TEXT NOT NULL,
    kind TEXT NOT NULL CHECK(kind IN ('plain','encrypted')),
    payload BLOB NOT NULL,
    nonce BLOB,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (collection, key),
    CHECK ((kind = 'plain' AND nonce IS NULL) OR (kind = 'encrypted' AND nonce IS NOT NULL))
);

CREATE INDEX IF NOT EXISTS idx_records_collection ON records(collection);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
