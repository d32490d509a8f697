//! In-Memory Session Store

use std::sync::Arc;

use dashmap::DashMap;

use crate::domain::entity::session::Session;
use crate::domain::repository::SessionStore;
use crate::domain::value_object::session_id::SessionId;
use crate::error::EdgeResult;

/// Process-local session store
///
/// Clones share the same map. Expired sessions are dropped on read and by
/// [`SessionStore::cleanup_expired`].
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<DashMap<SessionId, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &SessionId) -> EdgeResult<Option<Session>> {
        let session = match self.sessions.get(session_id) {
            Some(entry) => entry.value().clone(),
            None => return Ok(None),
        };

        if session.is_expired() {
            self.sessions
                .remove_if(session_id, |_, stored| stored.is_expired());
            tracing::debug!(session_id = %session_id, "Session expired");
            return Ok(None);
        }

        Ok(Some(session))
    }

    async fn put(&self, session_id: &SessionId, session: Session) -> EdgeResult<()> {
        self.sessions.insert(*session_id, session);
        Ok(())
    }

    async fn replace_if_present(
        &self,
        session_id: &SessionId,
        session: Session,
    ) -> EdgeResult<bool> {
        // The shard write lock is held from the check until the write
        match self.sessions.get_mut(session_id) {
            Some(mut entry) if !entry.is_expired() => {
                *entry = session;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear(&self, session_id: &SessionId) -> EdgeResult<()> {
        self.sessions.remove(session_id);
        Ok(())
    }

    async fn cleanup_expired(&self) -> EdgeResult<u64> {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired());
        let deleted = before.saturating_sub(self.sessions.len()) as u64;

        tracing::info!(sessions_deleted = deleted, "Cleaned up expired edge sessions");

        Ok(deleted)
    }
}
