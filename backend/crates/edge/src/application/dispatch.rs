//! Proxy Dispatcher
//!
//! Forwards one captured request on behalf of a session: call, detect an
//! expired credential, refresh, replay once.

use std::sync::Arc;

use crate::application::config::EdgeConfig;
use crate::application::refresh::{RefreshCoordinator, RefreshOutcome};
use crate::domain::backend::{BackendClient, CallOutcome};
use crate::domain::entity::exchange::{BackendResponse, RequestDescriptor};
use crate::domain::entity::session::Session;
use crate::domain::repository::SessionStore;
use crate::domain::value_object::session_id::SessionId;
use crate::error::{EdgeError, EdgeResult};

/// A forwarded backend response
#[derive(Debug)]
pub struct Forwarded {
    pub response: BackendResponse,
    /// Set when the session was renewed while serving this request; the
    /// transport must hand the new session state back to the caller
    pub renewed: Option<Session>,
}

/// Proxy dispatcher
pub struct ProxyDispatcher<S, B> {
    store: Arc<S>,
    backend: Arc<B>,
    coordinator: RefreshCoordinator<S, B>,
}

impl<S, B> ProxyDispatcher<S, B>
where
    S: SessionStore + Send + Sync + 'static,
    B: BackendClient + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, backend: Arc<B>, config: Arc<EdgeConfig>) -> Self {
        let coordinator = RefreshCoordinator::new(Arc::clone(&store), Arc::clone(&backend), config);
        Self {
            store,
            backend,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &RefreshCoordinator<S, B> {
        &self.coordinator
    }

    /// Whether a live session is still stored for `session_id`
    pub async fn holds_session(&self, session_id: &SessionId) -> bool {
        matches!(self.store.get(session_id).await, Ok(Some(_)))
    }

    /// Forward `request` with the session's access credential
    ///
    /// A rejected credential triggers one refresh and exactly one replay.
    /// A replay that is rejected again fails without a second refresh. The
    /// renewed session stays stored.
    pub async fn forward(
        &self,
        session_id: &SessionId,
        request: &RequestDescriptor,
    ) -> EdgeResult<Forwarded> {
        let session = self
            .store
            .get(session_id)
            .await?
            .ok_or(EdgeError::Unauthenticated)?;

        match self
            .backend
            .call(Some(session.access_token.expose()), request)
            .await
        {
            CallOutcome::Completed(response) => {
                return Ok(Forwarded {
                    response,
                    renewed: None,
                });
            }
            CallOutcome::Unreachable(reason) => return Err(EdgeError::BackendUnavailable(reason)),
            CallOutcome::Unauthorized(_) => {
                tracing::debug!(
                    session_id = %session_id,
                    method = %request.method(),
                    path = request.path(),
                    "Access credential rejected, refreshing"
                );
            }
        }

        let renewed = match self.coordinator.refresh(session_id, &session).await {
            RefreshOutcome::Renewed(renewed) => renewed,
            RefreshOutcome::Rejected(reason) => {
                tracing::info!(session_id = %session_id, reason = %reason, "Session could not be renewed");
                return Err(EdgeError::Unauthenticated);
            }
        };

        match self
            .backend
            .call(Some(renewed.access_token.expose()), request)
            .await
        {
            CallOutcome::Completed(response) => Ok(Forwarded {
                response,
                renewed: Some(renewed),
            }),
            CallOutcome::Unreachable(reason) => Err(EdgeError::BackendUnavailable(reason)),
            CallOutcome::Unauthorized(_) => {
                tracing::warn!(
                    session_id = %session_id,
                    path = request.path(),
                    "Renewed credential rejected on replay"
                );
                Err(EdgeError::Unauthenticated)
            }
        }
    }
}
