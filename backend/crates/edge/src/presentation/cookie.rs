//! Signed Session Cookie
//!
//! The cookie carries `<session id>.<signature>`. It is only a lookup key
//! into the session store; a value that fails verification is treated as no
//! session at all.

use axum::http::{HeaderMap, HeaderValue};
use platform::crypto::{sign_value, verify_signed_value};

use crate::application::config::EdgeConfig;
use crate::domain::value_object::session_id::SessionId;

/// What the caller presented as a session cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentedSession {
    Absent,
    Valid(SessionId),
    /// Bad signature or not a session id
    Rejected,
}

/// Set-Cookie value carrying `session_id`
pub fn issue_session_cookie(config: &EdgeConfig, session_id: &SessionId) -> Option<HeaderValue> {
    let token = sign_value(&config.session_secret, &session_id.to_string());
    platform::cookie::set_cookie_header(&config.session_cookie(), &token)
}

/// Set-Cookie value removing the session cookie
pub fn clear_session_cookie(config: &EdgeConfig) -> Option<HeaderValue> {
    platform::cookie::delete_cookie_header(&config.session_cookie())
}

/// Read and verify the session cookie
pub fn read_session_cookie(config: &EdgeConfig, headers: &HeaderMap) -> PresentedSession {
    let Some(token) = platform::cookie::extract_cookie(headers, &config.session_cookie_name) else {
        return PresentedSession::Absent;
    };

    let value = match verify_signed_value(&config.session_secret, &token) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "Session cookie rejected");
            return PresentedSession::Rejected;
        }
    };

    match value.parse::<SessionId>() {
        Ok(session_id) => PresentedSession::Valid(session_id),
        Err(e) => {
            tracing::debug!(error = %e, "Session cookie does not hold a session id");
            PresentedSession::Rejected
        }
    }
}
