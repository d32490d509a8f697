//! Domain Layer
//!
//! Entities, value objects, and the traits for the two external
//! collaborators: the session store and the backend service.

pub mod backend;
pub mod entity;
pub mod repository;
pub mod value_object;

// Re-exports
pub use backend::{BackendClient, CallOutcome};
pub use entity::{
    exchange::{BackendResponse, RequestDescriptor},
    session::{Session, TokenPair},
};
pub use repository::SessionStore;
pub use value_object::{
    credential::{AccessToken, RefreshToken},
    session_id::SessionId,
};
