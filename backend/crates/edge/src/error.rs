//! Edge Error Types
//!
//! Edge-specific error variants that integrate with the unified
//! `kernel::error::AppError` system. Domain errors from the backend are not
//! represented here: they are relayed to the caller verbatim.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Header telling the front-end that it has to sign in again
pub const AUTH_REQUIRED_HEADER: &str = "x-auth-required";

/// Edge-specific result type alias
pub type EdgeResult<T> = Result<T, EdgeError>;

/// Edge-specific error variants
#[derive(Debug, Error)]
pub enum EdgeError {
    /// No session, or the session could not be renewed
    #[error("Session is missing or no longer valid")]
    Unauthenticated,

    /// Transport failure reaching the backend
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Backend answered 2xx with a payload the edge cannot use
    #[error("Unusable backend response: {0}")]
    BadGateway(String),

    /// Inbound body exceeds the buffering limit
    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Inbound request could not be captured
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Session store failure
    #[error("Session store error: {0}")]
    SessionStore(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EdgeError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            EdgeError::Unauthenticated => StatusCode::UNAUTHORIZED,
            EdgeError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            EdgeError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            EdgeError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            EdgeError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            EdgeError::SessionStore(_) | EdgeError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            EdgeError::Unauthenticated => ErrorKind::Unauthorized,
            EdgeError::BackendUnavailable(_) => ErrorKind::ServiceUnavailable,
            EdgeError::BadGateway(_) => ErrorKind::BadGateway,
            EdgeError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            EdgeError::InvalidRequest(_) => ErrorKind::BadRequest,
            EdgeError::SessionStore(_) | EdgeError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Convert to AppError
    ///
    /// Server-side details stay in the logs; callers get a generic message.
    pub fn to_app_error(&self) -> AppError {
        match self {
            EdgeError::Unauthenticated => {
                AppError::unauthorized(self.to_string()).with_action("Please sign in again")
            }
            EdgeError::BackendUnavailable(_) => {
                AppError::service_unavailable("Backend service is unreachable")
                    .with_action("Please retry shortly")
            }
            EdgeError::BadGateway(_) => AppError::bad_gateway("Backend response was unusable"),
            EdgeError::SessionStore(_) | EdgeError::Internal(_) => {
                AppError::internal("Internal error")
            }
            EdgeError::PayloadTooLarge { .. } | EdgeError::InvalidRequest(_) => {
                AppError::new(self.kind(), self.to_string())
            }
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            EdgeError::SessionStore(msg) => {
                tracing::error!(message = %msg, "Session store error");
            }
            EdgeError::Internal(msg) => {
                tracing::error!(message = %msg, "Edge internal error");
            }
            EdgeError::BackendUnavailable(reason) => {
                tracing::warn!(reason = %reason, "Backend unavailable");
            }
            EdgeError::BadGateway(reason) => {
                tracing::warn!(reason = %reason, "Unusable backend response");
            }
            _ => {
                tracing::debug!(error = %self, "Edge error");
            }
        }
    }
}

impl IntoResponse for EdgeError {
    fn into_response(self) -> Response {
        self.log();
        let unauthenticated = matches!(self, EdgeError::Unauthenticated);
        let mut response = self.to_app_error().into_response();
        if unauthenticated {
            response
                .headers_mut()
                .insert(AUTH_REQUIRED_HEADER, HeaderValue::from_static("true"));
        }
        response
    }
}
