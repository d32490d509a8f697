//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (SHA-256, HMAC signing, Base64)
//! - Cookie management
//! - Header filtering for proxied requests and responses

pub mod cookie;
pub mod crypto;
pub mod headers;
