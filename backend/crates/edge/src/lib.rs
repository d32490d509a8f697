//! Edge (Session-Refreshing Proxy) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Session entity, credentials, store and backend traits
//! - `application/` - Use cases, refresh coordinator, proxy dispatcher
//! - `infra/` - In-memory session store, reqwest backend client
//! - `presentation/` - HTTP handlers, DTOs, router, signed session cookie
//!
//! ## Features
//! - Transparent renewal of expired access credentials
//! - One refresh per session at a time, shared by every waiting request
//! - Buffered request bodies, replayed once after renewal
//! - Login, registration, logout and "who am I" against the backend
//!
//! ## Security Model
//! - Credentials never reach the browser; it only holds a signed session id
//! - Session cookie signed with HMAC-SHA256, HttpOnly
//! - Token material is zeroized and redacted from debug output

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::config::EdgeConfig;
pub use error::{EdgeError, EdgeResult};
pub use infra::http::ReqwestBackendClient;
pub use infra::memory::MemorySessionStore;
pub use presentation::router::{edge_router, edge_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{app_error::AppError, kind::ErrorKind};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod store {
    pub use crate::domain::repository::SessionStore;
    pub use crate::infra::memory::MemorySessionStore;
}
