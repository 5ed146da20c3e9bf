//! Authentication configuration
//!
//! # Example
//!
//! ```toml
//! [auth]
//! access_secret = "change-me-to-a-real-secret-32-bytes!"
//! refresh_secret = "change-me-refresh"
//! access_ttl = "24h"
//! refresh_ttl = "30d"
//! super_admin_email = "ops@example.com"
//! ```

use std::time::Duration;

use serde::Deserialize;

/// Minimum access-token secret length for HS256 signing
pub const MIN_SECRET_LEN: usize = 32;

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Secret for signing access tokens; must be at least 32 bytes
    pub access_secret: String,

    /// Secret for signing refresh tokens; independent of the access secret
    /// and stretched with SHA-256 when shorter than 32 bytes
    pub refresh_secret: String,

    /// Access-token lifetime
    /// Default: 24 hours
    #[serde(with = "humantime_serde")]
    pub access_ttl: Duration,

    /// Refresh-token lifetime
    /// Default: 30 days
    #[serde(with = "humantime_serde")]
    pub refresh_ttl: Duration,

    /// One-time login code lifetime
    /// Default: 10 minutes
    #[serde(with = "humantime_serde")]
    pub otp_ttl: Duration,

    /// Wrong guesses before a one-time code is poisoned
    /// Default: 5
    pub otp_max_attempts: u32,

    /// Password-reset token lifetime
    /// Default: 30 minutes
    #[serde(with = "humantime_serde")]
    pub reset_ttl: Duration,

    /// Role permission cache time-to-live
    /// Default: 300 seconds
    #[serde(with = "humantime_serde")]
    pub permission_cache_ttl: Duration,

    /// Email that is always elevated to platform admin in the global tenant
    pub super_admin_email: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_secret: String::new(),
            refresh_secret: String::new(),
            access_ttl: Duration::from_secs(24 * 60 * 60),
            refresh_ttl: Duration::from_secs(30 * 24 * 60 * 60),
            otp_ttl: Duration::from_secs(10 * 60),
            otp_max_attempts: 5,
            reset_ttl: Duration::from_secs(30 * 60),
            permission_cache_ttl: Duration::from_secs(300),
            super_admin_email: None,
        }
    }
}

impl AuthConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.access_secret.len() < MIN_SECRET_LEN {
            return Err(format!(
                "auth.access_secret must be at least {} bytes",
                MIN_SECRET_LEN
            ));
        }
        if self.refresh_secret.is_empty() {
            return Err("auth.refresh_secret is required".to_string());
        }
        if self.refresh_secret == self.access_secret {
            return Err("auth.refresh_secret must differ from auth.access_secret".to_string());
        }
        if self.otp_max_attempts == 0 {
            return Err("auth.otp_max_attempts must be at least 1".to_string());
        }
        Ok(())
    }

    /// Normalized super-admin email, if configured
    pub fn super_admin_email(&self) -> Option<String> {
        self.super_admin_email
            .as_ref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
    }
}
