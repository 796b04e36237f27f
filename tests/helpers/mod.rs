#![allow(dead_code)]

use solace::config::MemoryConfig;
use solace::db;
use solace::memory::MemoryManager;
use solace::session::{ChatSession, Role, SessionStore};
use solace::store::Stores;
use std::sync::Arc;

pub const USER: &str = "alice";
pub const PASSPHRASE: &str = "correct horse battery staple";

/// Fresh in-memory stores with schema and migrations applied, still locked.
pub fn test_stores() -> Stores {
    Stores::new(db::open_memory_database().unwrap())
}

/// Fresh stores unlocked for [`USER`].
pub fn unlocked_stores() -> Stores {
    let stores = test_stores();
    stores.unlock(USER, PASSPHRASE).unwrap();
    stores
}

/// A memory manager over unlocked in-memory stores.
pub fn test_manager(recent_window_size: usize, summarize_threshold: usize) -> MemoryManager {
    let stores = unlocked_stores();
    let sessions = Arc::new(SessionStore::new(Arc::clone(&stores.chats)));
    MemoryManager::new(
        sessions,
        MemoryConfig {
            recent_window_size,
            summarize_threshold,
            max_summary_length: 300,
        },
    )
    .unwrap()
}

/// Append one user/assistant pair numbered `n`.
pub fn add_pair(manager: &MemoryManager, session: &mut ChatSession, n: usize) {
    assert!(manager
        .add_message(session, Role::User, &format!("user message {n}"))
        .unwrap());
    assert!(manager
        .add_message(session, Role::Assistant, &format!("assistant reply {n}"))
        .unwrap());
}

/// Assert the summarized range and the verbatim tail partition the conversation.
pub fn assert_window_invariant(manager: &MemoryManager, session: &ChatSession) {
    let conversation: Vec<_> = session.conversation().cloned().collect();
    let summarized = session.summarized_count();
    let context = manager.get_memory_context(session);

    assert!(summarized <= conversation.len());
    assert_eq!(
        summarized + context.recent_messages.len(),
        conversation.len(),
        "every message is either summarized or verbatim"
    );
    assert_eq!(context.recent_messages, conversation[summarized..].to_vec());
    if session.summary.is_some() {
        let older = conversation
            .len()
            .saturating_sub(manager.config().recent_window_size);
        assert!(summarized <= older, "summary reaches into the recent window");
    }
}
