//! CLI `reset` command: delete all of a user's sessions after confirmation.

use anyhow::{bail, Result};
use std::io::Write;

use super::App;

/// Delete every session owned by the current user after confirmation.
pub fn reset(app: &App) -> Result<()> {
    println!(
        "WARNING: This will permanently delete ALL chat sessions for {}.",
        app.user
    );
    print!("\nType YES to confirm: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    if input.trim() != "YES" {
        bail!("reset cancelled");
    }

    let removed = app.sessions.delete_sessions_for_owner(&app.user);
    println!("Deleted {removed} sessions.");
    Ok(())
}
