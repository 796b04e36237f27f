pub mod chat;
pub mod doctor;
pub mod reset;
pub mod session;

use anyhow::{bail, Context, Result};
use std::io::Write;
use std::sync::Arc;

use solace::config::SolaceConfig;
use solace::memory::MemoryManager;
use solace::session::{ChatSession, SessionStore};
use solace::store::Stores;

/// Services for one unlocked user, built once per invocation.
pub struct App {
    pub user: String,
    pub sessions: Arc<SessionStore>,
    pub memory: MemoryManager,
}

impl App {
    /// Open the database and unlock the user's collections.
    pub fn open(config: &SolaceConfig, user: &str) -> Result<Self> {
        let db_path = config.resolved_db_path();
        let conn = solace::db::open_database(&db_path)?;
        let stores = Stores::new(conn);

        let passphrase = read_passphrase(user)?;
        stores
            .unlock(user, &passphrase)
            .context("failed to unlock stores")?;

        let sessions = Arc::new(SessionStore::new(Arc::clone(&stores.chats)));
        let memory = MemoryManager::from_config(Arc::clone(&sessions), config)?;

        Ok(Self {
            user: user.to_string(),
            sessions,
            memory,
        })
    }

    /// Load a session that belongs to the current user.
    pub fn session(&self, id: &str) -> Result<ChatSession> {
        match self.sessions.get_session(id) {
            Some(session) if session.owner_id == self.user => Ok(session),
            // Either missing, someone else's, or sealed under a different passphrase.
            _ => bail!("session not found or unreadable: {id}"),
        }
    }
}

/// `--user`, else `$SOLACE_USER`.
pub fn resolve_user(flag: Option<String>) -> Result<String> {
    let user = flag
        .or_else(|| std::env::var("SOLACE_USER").ok())
        .filter(|u| !u.trim().is_empty());
    match user {
        Some(user) => Ok(user),
        None => bail!("no user given: pass --user or set SOLACE_USER"),
    }
}

/// `$SOLACE_PASSPHRASE`, else prompt on stdin.
fn read_passphrase(user: &str) -> Result<String> {
    if let Ok(passphrase) = std::env::var("SOLACE_PASSPHRASE") {
        return Ok(passphrase);
    }

    eprint!("Passphrase for {user}: ");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    let passphrase = input.trim_end_matches(['\r', '\n']).to_string();
    if passphrase.is_empty() {
        bail!("passphrase must not be empty");
    }
    Ok(passphrase)
}
