//! API DTOs (Data Transfer Objects)

use serde::{Deserialize, Serialize};

use crate::application::who_am_i::UserSummary;

// ============================================================================
// Sign Up
// ============================================================================

/// Sign up request
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpRequest {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
}

// ============================================================================
// Sign In
// ============================================================================

/// Sign in request
#[derive(Debug, Clone, Deserialize)]
pub struct SignInRequest {
    /// User name or email
    pub identifier: String,
    pub password: String,
}

/// Returned when login or registration opened a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionEstablishedResponse {
    pub authenticated: bool,
}

// ============================================================================
// Who Am I
// ============================================================================

/// Who am I response
#[derive(Debug, Clone, Serialize)]
pub struct WhoAmIResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}
