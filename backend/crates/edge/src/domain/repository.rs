//! Repository Traits
//!
//! The session store contract. Storage technology lives in the
//! infrastructure layer.

use crate::domain::entity::session::Session;
use crate::domain::value_object::session_id::SessionId;
use crate::error::EdgeResult;

/// Session store trait
///
/// Called concurrently for the same `SessionId`. A `put` replaces the whole
/// pair as one unit, last writer wins. Refreshed pairs go through
/// `replace_if_present` so they never outlive a logout.
#[trait_variant::make(SessionStore: Send)]
pub trait LocalSessionStore {
    /// Current session, or `None` when absent or expired
    async fn get(&self, session_id: &SessionId) -> EdgeResult<Option<Session>>;

    /// Atomically replace the session
    async fn put(&self, session_id: &SessionId, session: Session) -> EdgeResult<()>;

    /// Replace the session only if a live one is still stored
    ///
    /// The presence check and the write happen as one step, so a concurrent
    /// `clear` either lands before (nothing is written, returns `false`) or
    /// after (the new session is removed).
    async fn replace_if_present(
        &self,
        session_id: &SessionId,
        session: Session,
    ) -> EdgeResult<bool>;

    /// Remove the session (idempotent)
    async fn clear(&self, session_id: &SessionId) -> EdgeResult<()>;

    /// Clean up expired sessions, returning how many were removed
    async fn cleanup_expired(&self) -> EdgeResult<u64>;
}
