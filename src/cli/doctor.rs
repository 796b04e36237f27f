//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use solace::config::SolaceConfig;
use solace::crypto;
use solace::db;

/// Run database diagnostics and print a health report.
pub fn doctor(config: &SolaceConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `solace session new` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path)
        .map(|m| m.len())
        .unwrap_or(0);

    let conn = db::open_database(&db_path)
        .context("failed to open database (may be corrupt)")?;

    let report = db::check_database_health(&conn)
        .context("failed to run health check")?;

    println!("Solace Health Report");
    println!("====================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!();
    println!("Key derivation:");
    println!("  Stored:          {}", report.kdf.as_deref().unwrap_or("(not set)"));
    println!("  Current:         {}", crypto::kdf_id());
    if let Some(ref stored) = report.kdf {
        if *stored != crypto::kdf_id() {
            println!("  WARNING: mismatch! Records sealed under the stored derivation will be unreadable.");
        } else {
            println!("  Status:          OK (match)");
        }
    }
    println!();
    println!("Records:");
    println!("  Total:           {}", report.record_count);
    println!("  Encrypted:       {}", report.encrypted_count);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery: restore ~/.solace/solace.db from a backup.");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
