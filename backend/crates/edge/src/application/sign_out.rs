//! Sign Out Use Case
//!
//! Ends an edge session. The backend is told on a best-effort basis; the
//! local session is cleared whatever the backend says.

use std::sync::Arc;

use http::Method;

use crate::application::config::EdgeConfig;
use crate::domain::backend::{BackendClient, CallOutcome};
use crate::domain::entity::exchange::RequestDescriptor;
use crate::domain::repository::SessionStore;
use crate::domain::value_object::session_id::SessionId;
use crate::error::EdgeResult;

/// Sign out use case
pub struct SignOutUseCase<S, B>
where
    S: SessionStore,
    B: BackendClient,
{
    store: Arc<S>,
    backend: Arc<B>,
    config: Arc<EdgeConfig>,
}

impl<S, B> SignOutUseCase<S, B>
where
    S: SessionStore,
    B: BackendClient,
{
    pub fn new(store: Arc<S>, backend: Arc<B>, config: Arc<EdgeConfig>) -> Self {
        Self {
            store,
            backend,
            config,
        }
    }

    /// Sign out (idempotent)
    pub async fn execute(&self, session_id: Option<SessionId>) -> EdgeResult<()> {
        let Some(session_id) = session_id else {
            return Ok(());
        };

        match self.store.get(&session_id).await {
            Ok(Some(session)) => {
                self.notify_backend(&session_id, session.access_token.expose())
                    .await;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Session lookup failed during sign out");
            }
        }

        self.store.clear(&session_id).await?;

        tracing::info!(session_id = %session_id, "User signed out");
        Ok(())
    }

    async fn notify_backend(&self, session_id: &SessionId, access_token: &str) {
        let request = RequestDescriptor::new(Method::POST, self.config.logout_path.as_str());
        let call = self.backend.call(Some(access_token), &request);

        match tokio::time::timeout(self.config.refresh_timeout, call).await {
            Ok(CallOutcome::Completed(response)) if response.is_success() => {
                tracing::debug!(session_id = %session_id, "Backend acknowledged sign out");
            }
            Ok(CallOutcome::Completed(response)) | Ok(CallOutcome::Unauthorized(response)) => {
                tracing::debug!(
                    session_id = %session_id,
                    status = response.status().as_u16(),
                    "Backend refused sign out"
                );
            }
            Ok(CallOutcome::Unreachable(reason)) => {
                tracing::warn!(session_id = %session_id, reason = %reason, "Backend unreachable during sign out");
            }
            Err(_) => {
                tracing::warn!(session_id = %session_id, "Backend sign out timed out");
            }
        }
    }
}
