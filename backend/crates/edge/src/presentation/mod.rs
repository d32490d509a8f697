//! Presentation Layer
//!
//! HTTP handlers, DTOs, router, session cookie, and middleware.

pub mod cookie;
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use handlers::EdgeAppState;
pub use middleware::{SessionContext, resolve_session};
pub use router::{edge_router, edge_router_generic};
