//! Session Middleware
//!
//! Resolves the signed session cookie once per request and stores the
//! result in request extensions for the handlers.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::application::config::EdgeConfig;
use crate::domain::value_object::session_id::SessionId;
use crate::presentation::cookie::{PresentedSession, read_session_cookie};

/// Session resolved from the request cookie
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionContext {
    pub session_id: Option<SessionId>,
    /// A cookie was presented but failed verification
    pub cookie_rejected: bool,
}

/// Middleware that attaches a [`SessionContext`] to every request
pub async fn resolve_session(
    State(config): State<Arc<EdgeConfig>>,
    mut req: Request,
    next: Next,
) -> Response {
    let context = match read_session_cookie(&config, req.headers()) {
        PresentedSession::Absent => SessionContext::default(),
        PresentedSession::Valid(session_id) => SessionContext {
            session_id: Some(session_id),
            cookie_rejected: false,
        },
        PresentedSession::Rejected => SessionContext {
            session_id: None,
            cookie_rejected: true,
        },
    };

    req.extensions_mut().insert(context);

    next.run(req).await
}
