//! Session Entity
//!
//! The credential pair the edge holds on behalf of one signed-in caller.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::domain::value_object::credential::{AccessToken, RefreshToken};

/// Token pair as issued by the backend's login, register and refresh endpoints
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    access_token: String,
    refresh_token: String,
}

/// Why a backend payload could not be read as a [`TokenPair`]
#[derive(Debug, thiserror::Error)]
pub enum TokenPairError {
    #[error("Token pair is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Token pair is incomplete")]
    Incomplete,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Parse a backend body, rejecting pairs with an empty half
    pub fn parse(body: &[u8]) -> Result<Self, TokenPairError> {
        let pair: TokenPair = serde_json::from_slice(body)?;
        if pair.access_token.is_empty() || pair.refresh_token.is_empty() {
            return Err(TokenPairError::Incomplete);
        }
        Ok(pair)
    }
}

/// Edge session entity
///
/// Only constructible from a complete [`TokenPair`], so a stored session
/// always holds both credentials.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    /// When this pair was issued
    pub issued_at: DateTime<Utc>,
    /// Session expiration (Unix timestamp ms), bounded by the refresh lifetime
    pub expires_at_ms: i64,
}

impl Session {
    /// Create a session from a freshly issued pair
    ///
    /// TTL is provided by the application layer (config), not hard-coded here.
    pub fn from_pair(pair: TokenPair, ttl: Duration) -> Self {
        let now = Utc::now();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);

        Self {
            access_token: AccessToken::new(pair.access_token.as_str()),
            refresh_token: RefreshToken::new(pair.refresh_token.as_str()),
            issued_at: now,
            expires_at_ms: now.timestamp_millis().saturating_add(ttl_ms),
        }
    }

    /// Check if session has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp_millis() > self.expires_at_ms
    }

    /// True when this session carries a different access token than `stale`
    pub fn supersedes(&self, stale: &Session) -> bool {
        self.access_token != stale.access_token
    }
}
