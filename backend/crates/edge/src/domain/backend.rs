//! Backend Client Trait
//!
//! A single call against the backend service. No retries happen behind this
//! trait; retry policy belongs to the dispatcher.

use crate::domain::entity::exchange::{BackendResponse, RequestDescriptor};

/// Result of one backend call
#[derive(Debug, Clone)]
pub enum CallOutcome {
    /// Any HTTP response other than 401, domain errors included
    Completed(BackendResponse),
    /// Status was exactly 401: the presented credential was rejected
    Unauthorized(BackendResponse),
    /// The backend could not be reached (connect failure, timeout, broken body)
    Unreachable(String),
}

impl CallOutcome {
    /// Classify an HTTP response
    pub fn from_response(response: BackendResponse) -> Self {
        if response.status() == http::StatusCode::UNAUTHORIZED {
            CallOutcome::Unauthorized(response)
        } else {
            CallOutcome::Completed(response)
        }
    }
}

/// Backend client trait
#[trait_variant::make(BackendClient: Send)]
pub trait LocalBackendClient {
    /// Perform `request`, presenting `bearer` as `Authorization: Bearer <token>`
    async fn call(&self, bearer: Option<&str>, request: &RequestDescriptor) -> CallOutcome;
}
