//! Refresh Coordinator
//!
//! Exchanges a session's refresh credential for a new pair. Refresh
//! credentials are one-time-use at the backend, so at most one exchange per
//! session may be in flight: callers that discover expiry while an exchange
//! is running attach to it and receive the same outcome.
//!
//! The exchange runs in its own task. Dropping the request that started it
//! does not cancel it, because other waiters may depend on its result.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::{BoxFuture, FutureExt, Shared};
use http::Method;

use crate::application::config::EdgeConfig;
use crate::domain::backend::{BackendClient, CallOutcome};
use crate::domain::entity::exchange::RequestDescriptor;
use crate::domain::entity::session::{Session, TokenPair};
use crate::domain::repository::SessionStore;
use crate::domain::value_object::credential::AccessToken;
use crate::domain::value_object::session_id::SessionId;

/// Why a refresh did not produce a new pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum RefreshFailure {
    /// Session was absent, expired, or logged out during the exchange
    #[display("session missing")]
    SessionMissing,
    /// Backend refused the refresh credential
    #[display("refresh credential rejected")]
    CredentialRejected,
    #[display("backend unreachable")]
    BackendUnreachable,
    #[display("refresh timed out")]
    TimedOut,
    /// Backend answered 2xx without a complete token pair
    #[display("malformed token pair")]
    MalformedResponse,
    #[display("session store unavailable")]
    StoreUnavailable,
    /// Exchange task ended without producing an outcome
    #[display("refresh task aborted")]
    Aborted,
}

/// Outcome shared by every caller of one refresh
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Renewed(Session),
    Rejected(RefreshFailure),
}

type InFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

struct Flight {
    id: u64,
    outcome: InFlight,
}

/// Single-flight refresh coordinator, keyed by session
pub struct RefreshCoordinator<S, B> {
    store: Arc<S>,
    backend: Arc<B>,
    config: Arc<EdgeConfig>,
    in_flight: Arc<DashMap<SessionId, Flight>>,
    next_flight: AtomicU64,
}

impl<S, B> RefreshCoordinator<S, B>
where
    S: SessionStore + Send + Sync + 'static,
    B: BackendClient + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, backend: Arc<B>, config: Arc<EdgeConfig>) -> Self {
        Self {
            store,
            backend,
            config,
            in_flight: Arc::new(DashMap::new()),
            next_flight: AtomicU64::new(0),
        }
    }

    /// Renew `stale`, the session a caller just saw rejected
    ///
    /// Returns the already-rotated pair without contacting the backend when
    /// another caller renewed the session first.
    pub async fn refresh(&self, session_id: &SessionId, stale: &Session) -> RefreshOutcome {
        match self.store.get(session_id).await {
            Ok(Some(current)) if current.supersedes(stale) => {
                tracing::debug!(session_id = %session_id, "Session already renewed");
                return RefreshOutcome::Renewed(current);
            }
            Ok(Some(_)) => {}
            Ok(None) => return RefreshOutcome::Rejected(RefreshFailure::SessionMissing),
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Session lookup failed before refresh");
                return RefreshOutcome::Rejected(RefreshFailure::StoreUnavailable);
            }
        }

        self.join_or_start(*session_id, stale.access_token.clone())
            .await
    }

    /// Number of sessions with an exchange currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn join_or_start(&self, session_id: SessionId, stale_access: AccessToken) -> InFlight {
        match self.in_flight.entry(session_id) {
            Entry::Occupied(entry) => {
                tracing::debug!(session_id = %session_id, "Joining in-flight refresh");
                entry.get().outcome.clone()
            }
            Entry::Vacant(entry) => {
                let flight_id = self.next_flight.fetch_add(1, Ordering::Relaxed);
                let exchange = CredentialExchange {
                    store: Arc::clone(&self.store),
                    backend: Arc::clone(&self.backend),
                    config: Arc::clone(&self.config),
                    session_id,
                    stale_access,
                };
                let release = FlightRelease {
                    registry: Arc::clone(&self.in_flight),
                    session_id,
                    flight_id,
                };

                let task = tokio::spawn(async move {
                    // Released after the store is updated, even if the exchange panics
                    let _release = release;
                    exchange.run().await
                });

                let outcome = async move {
                    task.await.unwrap_or_else(|e| {
                        tracing::error!(session_id = %session_id, error = %e, "Refresh task failed");
                        RefreshOutcome::Rejected(RefreshFailure::Aborted)
                    })
                }
                .boxed()
                .shared();

                entry.insert(Flight {
                    id: flight_id,
                    outcome: outcome.clone(),
                });
                outcome
            }
        }
    }
}

/// Removes a finished flight from the registry
struct FlightRelease {
    registry: Arc<DashMap<SessionId, Flight>>,
    session_id: SessionId,
    flight_id: u64,
}

impl Drop for FlightRelease {
    fn drop(&mut self) {
        self.registry
            .remove_if(&self.session_id, |_, flight| flight.id == self.flight_id);
    }
}

/// One credential exchange against the backend's refresh endpoint
struct CredentialExchange<S, B> {
    store: Arc<S>,
    backend: Arc<B>,
    config: Arc<EdgeConfig>,
    session_id: SessionId,
    stale_access: AccessToken,
}

impl<S, B> CredentialExchange<S, B>
where
    S: SessionStore + Send + Sync + 'static,
    B: BackendClient + Send + Sync + 'static,
{
    async fn run(self) -> RefreshOutcome {
        // A flight that finished between the caller's check and this one
        // has already rotated the pair.
        let current = match self.store.get(&self.session_id).await {
            Ok(Some(current)) => current,
            Ok(None) => return RefreshOutcome::Rejected(RefreshFailure::SessionMissing),
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "Session lookup failed");
                return self.abandon(RefreshFailure::StoreUnavailable).await;
            }
        };
        if current.access_token != self.stale_access {
            return RefreshOutcome::Renewed(current);
        }

        let request = RequestDescriptor::new(Method::POST, self.config.refresh_path.as_str());
        let call = self
            .backend
            .call(Some(current.refresh_token.expose()), &request);

        let failure = match tokio::time::timeout(self.config.refresh_timeout, call).await {
            Err(_) => RefreshFailure::TimedOut,
            Ok(CallOutcome::Unauthorized(_)) => RefreshFailure::CredentialRejected,
            Ok(CallOutcome::Unreachable(reason)) => {
                tracing::debug!(session_id = %self.session_id, reason = %reason, "Refresh endpoint unreachable");
                RefreshFailure::BackendUnreachable
            }
            Ok(CallOutcome::Completed(response)) if response.is_success() => {
                match TokenPair::parse(response.body()) {
                    Ok(pair) => {
                        let renewed = Session::from_pair(pair, self.config.session_ttl);
                        return self.persist(renewed).await;
                    }
                    Err(e) => {
                        tracing::warn!(session_id = %self.session_id, error = %e, "Refresh returned an unusable pair");
                        RefreshFailure::MalformedResponse
                    }
                }
            }
            Ok(CallOutcome::Completed(response)) => {
                tracing::debug!(
                    session_id = %self.session_id,
                    status = response.status().as_u16(),
                    "Refresh refused"
                );
                RefreshFailure::CredentialRejected
            }
        };

        self.abandon(failure).await
    }

    async fn persist(&self, renewed: Session) -> RefreshOutcome {
        // A logout that cleared the session during the exchange wins
        match self
            .store
            .replace_if_present(&self.session_id, renewed.clone())
            .await
        {
            Ok(true) => {
                tracing::info!(session_id = %self.session_id, "Session credentials renewed");
                RefreshOutcome::Renewed(renewed)
            }
            Ok(false) => {
                tracing::info!(session_id = %self.session_id, "Session ended during refresh, discarding new pair");
                RefreshOutcome::Rejected(RefreshFailure::SessionMissing)
            }
            Err(e) => {
                tracing::error!(session_id = %self.session_id, error = %e, "Failed to store renewed session");
                self.abandon(RefreshFailure::StoreUnavailable).await
            }
        }
    }

    async fn abandon(&self, failure: RefreshFailure) -> RefreshOutcome {
        tracing::warn!(session_id = %self.session_id, reason = %failure, "Refresh failed, clearing session");
        if let Err(e) = self.store.clear(&self.session_id).await {
            tracing::warn!(session_id = %self.session_id, error = %e, "Failed to clear session");
        }
        RefreshOutcome::Rejected(failure)
    }
}
