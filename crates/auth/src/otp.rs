//! One-time login codes
//!
//! Passwordless entry point: a 6-digit code is mailed to the address and
//! verified once. One record per email in the `login_codes` collection,
//! overwritten on every new request. A code dies on first successful use,
//! on expiry, or after too many wrong guesses.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use aviso_store::DocumentStore;

use crate::clock::SharedClock;
use crate::config::AuthConfig;
use crate::email::Mailer;
use crate::error::Result;

const LOGIN_CODES: &str = "login_codes";

/// Trim and lowercase an email for lookups and storage
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Persisted state of one pending login code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneTimeCodeRecord {
    /// Normalized email the code was issued for
    pub email: String,
    /// The 6-digit code
    pub code: String,
    /// When the code expires
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
    /// Wrong guesses so far
    #[serde(default)]
    pub attempts: u32,
}

/// Issues and verifies one-time login codes
#[derive(Clone)]
pub struct OtpService {
    store: Arc<dyn DocumentStore>,
    mailer: Arc<dyn Mailer>,
    clock: SharedClock,
    ttl: Duration,
    max_attempts: u32,
}

impl OtpService {
    /// Create the service from configuration
    pub fn new(
        store: Arc<dyn DocumentStore>,
        mailer: Arc<dyn Mailer>,
        clock: SharedClock,
        config: &AuthConfig,
    ) -> Self {
        Self {
            store,
            mailer,
            clock,
            ttl: Duration::from_std(config.otp_ttl).unwrap_or_else(|_| Duration::minutes(10)),
            max_attempts: config.otp_max_attempts,
        }
    }

    /// Generate and mail a fresh code for the address
    ///
    /// Deliberately does not check whether the email is registered; the
    /// observable outcome is identical either way, so the endpoint cannot
    /// be used to probe for accounts. Mail failure is logged, not fatal.
    pub async fn request_code(&self, email: &str) -> Result<()> {
        let normalized = normalize_email(email);
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        let ttl_minutes = self.ttl.num_minutes();

        let record = OneTimeCodeRecord {
            email: normalized.clone(),
            code: code.clone(),
            expires_at: self.clock.now() + self.ttl,
            attempts: 0,
        };
        let doc = serde_json::to_value(&record).map_err(aviso_store::StoreError::from)?;
        self.store.set(LOGIN_CODES, &normalized, doc).await?;

        let html = format!(
            concat!(
                r#"<div style="font-family: Arial, sans-serif; padding:16px; background:#f5f7fb;">"#,
                r#"<div style="max-width:520px;margin:0 auto;background:#fff;padding:20px;border-radius:12px;border:1px solid #e5e7eb;">"#,
                r#"<h2 style="margin:0 0 8px 0;color:#0f766e;">Access code</h2>"#,
                r#"<p style="margin:0 0 12px 0;color:#111827;">Use this code to sign in to the app:</p>"#,
                r#"<div style="font-size:28px;font-weight:700;letter-spacing:4px;color:#0f766e;text-align:center;padding:12px 0;">{code}</div>"#,
                r#"<p style="margin:12px 0 0 0;color:#6b7280;">Expires in {minutes} minutes.</p>"#,
                r#"</div></div>"#,
            ),
            code = code,
            minutes = ttl_minutes,
        );
        let text = format!("Your access code is: {}", code);

        let delivered = self
            .mailer
            .send(&normalized, "Your Aviso access code", Some(&html), Some(&text))
            .await;
        if !delivered {
            warn!(email = %normalized, "login code email was not delivered");
        }
        Ok(())
    }

    /// Check and consume a submitted code
    ///
    /// Returns `false` for an unknown email, a poisoned code (too many
    /// wrong guesses), an expired code (which is deleted on the way out),
    /// or a mismatch (which burns one attempt). A match consumes the
    /// record: the same code can never verify twice.
    pub async fn verify_code(&self, email: &str, code: &str) -> bool {
        if self.check_code(email, code).await {
            self.discard_code(email).await;
            return true;
        }
        false
    }

    /// Check a submitted code without consuming it on a match
    ///
    /// Same outcomes as [`verify_code`](Self::verify_code), but a matching
    /// record stays put. Used by the login flow when resolution may come
    /// back ambiguous and the client retries with the same code plus a
    /// student choice; the caller discards the code once a session is
    /// actually issued.
    pub async fn check_code(&self, email: &str, code: &str) -> bool {
        let normalized = normalize_email(email);
        let doc = match self.store.get(LOGIN_CODES, &normalized).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return false,
            Err(e) => {
                debug!(email = %normalized, "login code lookup failed: {}", e);
                return false;
            }
        };
        let Ok(record) = serde_json::from_value::<OneTimeCodeRecord>(doc) else {
            return false;
        };

        if record.attempts >= self.max_attempts {
            return false;
        }
        if record.expires_at <= self.clock.now() {
            if let Err(e) = self.store.delete(LOGIN_CODES, &normalized).await {
                debug!(email = %normalized, "expired login code cleanup failed: {}", e);
            }
            return false;
        }

        let submitted = code.trim();
        let matches = submitted.len() == record.code.len()
            && bool::from(submitted.as_bytes().ct_eq(record.code.as_bytes()));
        if matches {
            return true;
        }

        if let Err(e) = self
            .store
            .update(LOGIN_CODES, &normalized, json!({"attempts": record.attempts + 1}))
            .await
        {
            debug!(email = %normalized, "login code attempt bump failed: {}", e);
        }
        false
    }

    /// Drop any pending code for the address
    pub async fn discard_code(&self, email: &str) {
        let normalized = normalize_email(email);
        if let Err(e) = self.store.delete(LOGIN_CODES, &normalized).await {
            debug!(email = %normalized, "login code cleanup failed: {}", e);
        }
    }
}
