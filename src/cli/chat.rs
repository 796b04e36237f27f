//! CLI `say`, `context`, and `summarize` commands.

use anyhow::{anyhow, bail, Result};

use solace::config::SolaceConfig;
use solace::inference::CommandEngine;
use solace::memory::SummaryOutcome;
use solace::session::Role;

use super::App;

pub fn say(app: &App, session_id: &str, role: &str, content: &str) -> Result<()> {
    let role: Role = role.parse().map_err(|e: String| anyhow!(e))?;
    let mut session = app.session(session_id)?;

    let persisted = app.memory.add_message(&mut session, role, content)?;
    if !persisted {
        bail!("message not saved; try again");
    }

    if app.memory.needs_summary_update(&session) {
        eprintln!("Summary is due. Run `solace summarize {session_id}`.");
    }
    Ok(())
}

pub fn context(app: &App, session_id: &str) -> Result<()> {
    let session = app.session(session_id)?;
    let context = app.memory.get_memory_context(&session);

    if !context.context_prompt.is_empty() {
        print!("{}", context.context_prompt);
    }
    for m in &context.recent_messages {
        println!("{}: {}", m.role, m.content);
    }
    Ok(())
}

pub async fn summarize(
    app: &App,
    config: &SolaceConfig,
    session_id: &str,
    quick: bool,
) -> Result<()> {
    let mut session = app.session(session_id)?;

    if !app.memory.needs_summary_update(&session) {
        println!("Summary is up to date.");
        return Ok(());
    }

    let engine = CommandEngine::from_config(&config.inference).filter(|_| !quick);
    let outcome = match engine {
        Some(engine) => app.memory.summarize(&mut session, &engine).await,
        None => SummaryOutcome::Fallback {
            persisted: app.memory.apply_quick_summary(&mut session),
        },
    };

    match outcome {
        SummaryOutcome::NotNeeded => println!("Summary is up to date."),
        SummaryOutcome::Model { persisted: true } => println!("Summary updated by model."),
        SummaryOutcome::Fallback { persisted: true } => println!("Summary updated (quick)."),
        SummaryOutcome::Model { persisted: false } | SummaryOutcome::Fallback { persisted: false } => {
            bail!("summary generated but not saved; try again")
        }
    }

    if let Some(summary) = &session.summary {
        println!("  {}", summary.summary);
    }
    Ok(())
}
