//! Edge Router

use axum::{
    Router, middleware,
    routing::{any, get, post},
};
use std::sync::Arc;

use crate::application::config::EdgeConfig;
use crate::domain::backend::BackendClient;
use crate::domain::repository::SessionStore;
use crate::infra::http::ReqwestBackendClient;
use crate::infra::memory::MemorySessionStore;
use crate::presentation::handlers::{self, EdgeAppState};
use crate::presentation::middleware::resolve_session;

/// Create the edge router with the in-memory store and the reqwest client
pub fn edge_router(
    store: MemorySessionStore,
    backend: ReqwestBackendClient,
    config: EdgeConfig,
) -> Router {
    edge_router_generic(Arc::new(store), Arc::new(backend), config)
}

/// Create a generic edge router for any store and backend implementation
pub fn edge_router_generic<S, B>(store: Arc<S>, backend: Arc<B>, config: EdgeConfig) -> Router
where
    S: SessionStore + Send + Sync + 'static,
    B: BackendClient + Send + Sync + 'static,
{
    let config = Arc::new(config);
    let state = EdgeAppState::new(store, backend, Arc::clone(&config));

    Router::new()
        .route("/auth/login", post(handlers::sign_in::<S, B>))
        .route("/auth/register", post(handlers::sign_up::<S, B>))
        .route("/auth/logout", post(handlers::sign_out::<S, B>))
        .route("/auth/me", get(handlers::who_am_i::<S, B>))
        .route("/proxy/{*path}", any(handlers::proxy::<S, B>))
        .layer(middleware::from_fn_with_state(config, resolve_session))
        .with_state(state)
}
