//! Application Configuration
//!
//! Configuration for the edge proxy application layer.

use std::time::Duration;

use platform::cookie::CookieConfig;

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;

/// Edge proxy configuration
#[derive(Debug, Clone)]
pub struct EdgeConfig {
    /// Session cookie name
    pub session_cookie_name: String,
    /// Session secret key for HMAC signing (32 bytes)
    pub session_secret: [u8; 32],
    /// Session lifetime, equal to the refresh credential lifetime (1 week)
    pub session_ttl: Duration,
    /// Whether to require Secure cookie
    pub cookie_secure: bool,
    /// SameSite policy
    pub cookie_same_site: SameSite,
    /// Backend service base URL, e.g. `http://backend:8080`
    pub backend_base_url: String,
    /// TCP connect timeout towards the backend
    pub backend_connect_timeout: Duration,
    /// Whole-call timeout for proxied backend calls
    pub backend_timeout: Duration,
    /// Upper bound for a credential exchange and for best-effort logout
    pub refresh_timeout: Duration,
    /// Largest inbound body the edge buffers for replay
    pub max_body_bytes: usize,
    pub login_path: String,
    pub register_path: String,
    pub refresh_path: String,
    pub logout_path: String,
    /// Backend identity lookup behind "who am I"
    pub identity_path: String,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: "edu_session".to_string(),
            session_secret: [0u8; 32],
            session_ttl: Duration::from_secs(7 * 24 * 3600), // 1 week
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            backend_base_url: "http://localhost:8080".to_string(),
            backend_connect_timeout: Duration::from_secs(5),
            backend_timeout: Duration::from_secs(30),
            refresh_timeout: Duration::from_secs(5),
            max_body_bytes: 1024 * 1024,
            login_path: "/auth/login".to_string(),
            register_path: "/auth/register".to_string(),
            refresh_path: "/auth/refresh".to_string(),
            logout_path: "/auth/logout".to_string(),
            identity_path: "/auth/me".to_string(),
        }
    }
}

impl EdgeConfig {
    /// Create config with a random session secret (for development)
    pub fn with_random_secret() -> Self {
        Self {
            session_secret: platform::crypto::random_key(),
            ..Default::default()
        }
    }

    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Self::with_random_secret()
        }
    }

    /// Session cookie attributes (HttpOnly, whole-application path)
    pub fn session_cookie(&self) -> CookieConfig {
        CookieConfig {
            name: self.session_cookie_name.clone(),
            secure: self.cookie_secure,
            http_only: true,
            same_site: self.cookie_same_site,
            path: "/".to_string(),
            max_age_secs: Some(self.session_ttl.as_secs()),
        }
    }
}
