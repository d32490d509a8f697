//! Infrastructure Layer
//!
//! Session storage and the HTTP client for the backend service.

pub mod http;
pub mod memory;

pub use self::http::ReqwestBackendClient;
pub use memory::MemorySessionStore;
