//! CLI `session` commands.

use anyhow::{bail, Result};

use super::App;

pub fn new(app: &App, title: Option<&str>) -> Result<()> {
    let session = app.sessions.create_session(&app.user, title);
    println!("{}", session.id);
    Ok(())
}

pub fn list(app: &App) -> Result<()> {
    let sessions = app.sessions.get_sessions_for_owner(&app.user);
    if sessions.is_empty() {
        println!("No sessions.");
        return Ok(());
    }

    for s in &sessions {
        println!(
            "{}  {:<40}  {:>4} msgs  {}",
            s.id,
            s.title,
            s.messages.len(),
            s.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

pub fn show(app: &App, id: &str) -> Result<()> {
    let session = app.session(id)?;

    println!("Session: {}", session.id);
    println!("{}", "=".repeat(50));
    println!("  Title:     {}", session.title);
    println!("  Created:   {}", session.created_at.to_rfc3339());
    println!("  Updated:   {}", session.updated_at.to_rfc3339());
    println!("  Messages:  {}", session.messages.len());

    if let Some(ref summary) = session.summary {
        println!();
        println!("Summary (covers {} messages):", summary.message_count);
        println!("  {}", summary.summary);
        if !summary.key_topics.is_empty() {
            println!("  Topics:    {}", summary.key_topics.join(", "));
        }
        if !summary.emotional_themes.is_empty() {
            println!("  Emotions:  {}", summary.emotional_themes.join(", "));
        }
        if !summary.user_mentions.is_empty() {
            println!("  Mentions:  {}", summary.user_mentions.join(", "));
        }
    }

    println!();
    for m in &session.messages {
        println!("[{}] {}: {}", m.timestamp.format("%H:%M"), m.role, m.content);
    }
    Ok(())
}

pub fn delete(app: &App, id: &str) -> Result<()> {
    // Ownership check before the hard delete.
    app.session(id)?;
    if !app.sessions.delete_session(id) {
        bail!("failed to delete session {id}");
    }
    println!("Deleted {id}");
    Ok(())
}
