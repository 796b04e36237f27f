//! Session CRUD over the chats collection.

use chrono::Utc;
use std::sync::Arc;

use super::types::ChatSession;
use crate::store::EncryptedStore;

/// Persists [`ChatSession`]s, one record per session id. Holds no key material;
/// encryption is whatever the underlying collection does.
pub struct SessionStore {
    store: Arc<EncryptedStore>,
}

impl SessionStore {
    pub fn new(store: Arc<EncryptedStore>) -> Self {
        Self { store }
    }

    /// Allocate a fresh session for `owner_id` and persist it.
    ///
    /// The session is returned even if the write failed; the next
    /// [`save_session`](Self::save_session) retries it.
    pub fn create_session(&self, owner_id: &str, title: Option<&str>) -> ChatSession {
        let session = ChatSession::new(owner_id, title);
        if !self.store.save(&session.id, &session) {
            tracing::warn!(session = %session.id, "new session not persisted");
        }
        tracing::debug!(session = %session.id, owner = owner_id, "session created");
        session
    }

    pub fn get_session(&self, id: &str) -> Option<ChatSession> {
        self.store.get(id)
    }

    /// All readable sessions belonging to `owner_id`, most recently updated first.
    pub fn get_sessions_for_owner(&self, owner_id: &str) -> Vec<ChatSession> {
        let mut sessions: Vec<ChatSession> = self
            .store
            .get_all::<ChatSession>()
            .into_iter()
            .map(|(_, session)| session)
            .filter(|s| s.owner_id == owner_id)
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sessions
    }

    /// Refresh `updated_at` and write the whole session. Last writer wins.
    pub fn save_session(&self, session: &mut ChatSession) -> bool {
        session.updated_at = Utc::now();
        self.store.save(&session.id, &*session)
    }

    /// Hard-delete a session.
    pub fn delete_session(&self, id: &str) -> bool {
        let removed = self.store.remove(id);
        if removed {
            tracing::info!(session = id, "session deleted");
        }
        removed
    }

    /// Hard-delete every session owned by `owner_id`. Returns how many were removed.
    pub fn delete_sessions_for_owner(&self, owner_id: &str) -> usize {
        self.get_sessions_for_owner(owner_id)
            .iter()
            .filter(|s| self.delete_session(&s.id))
            .count()
    }
}
