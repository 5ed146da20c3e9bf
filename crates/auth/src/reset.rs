//! Password reset
//!
//! Classic emailed-token flow for staff accounts: a random single-use
//! token is stored in the `password_resets` collection and mailed out;
//! presenting it within its lifetime replaces the account's password hash
//! and consumes the token. Guardian sessions have no password, so this
//! flow only ever touches `users` records.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use aviso_store::DocumentStore;

use crate::clock::SharedClock;
use crate::config::AuthConfig;
use crate::directory::Directory;
use crate::email::Mailer;
use crate::error::{AuthError, Result};
use crate::otp::normalize_email;
use crate::password::hash_password;

const PASSWORD_RESETS: &str = "password_resets";

/// Persisted state of one pending reset token
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResetTokenRecord {
    /// The token itself, also the record key
    id: String,
    /// Account email the token was issued for
    email: String,
    /// When the token expires
    #[serde(rename = "expiresAt")]
    expires_at: DateTime<Utc>,
}

/// Issues and redeems password-reset tokens
#[derive(Clone)]
pub struct PasswordResetService {
    store: Arc<dyn DocumentStore>,
    directory: Directory,
    mailer: Arc<dyn Mailer>,
    clock: SharedClock,
    ttl: Duration,
}

impl PasswordResetService {
    /// Create the service from configuration
    pub fn new(
        store: Arc<dyn DocumentStore>,
        mailer: Arc<dyn Mailer>,
        clock: SharedClock,
        config: &AuthConfig,
    ) -> Self {
        Self {
            directory: Directory::new(store.clone()),
            store,
            mailer,
            clock,
            ttl: Duration::from_std(config.reset_ttl).unwrap_or_else(|_| Duration::minutes(30)),
        }
    }

    /// Issue a reset token and mail it to the account
    ///
    /// Fails with [`AuthError::UnknownUser`] when no staff account exists
    /// for the email; resets only apply to accounts that hold a password.
    pub async fn request_reset(&self, email: &str) -> Result<String> {
        let normalized = normalize_email(email);
        let user = self
            .directory
            .find_user_by_email(&normalized)
            .await?
            .ok_or(AuthError::UnknownUser)?;

        let token = Uuid::new_v4().to_string();
        let record = ResetTokenRecord {
            id: token.clone(),
            email: user.email.clone(),
            expires_at: self.clock.now() + self.ttl,
        };
        let doc = serde_json::to_value(&record).map_err(aviso_store::StoreError::from)?;
        self.store.set(PASSWORD_RESETS, &token, doc).await?;

        let minutes = self.ttl.num_minutes();
        let text = format!(
            "A password reset was requested for your account.\n\
             Your reset code is: {}\n\
             It expires in {} minutes. If you did not ask for this, ignore this email.",
            token, minutes
        );
        let delivered = self
            .mailer
            .send(&user.email, "Reset your Aviso password", None, Some(&text))
            .await;
        if !delivered {
            warn!(email = %user.email, "password reset email was not delivered");
        }
        Ok(token)
    }

    /// Redeem a reset token and set the new password
    ///
    /// A missing, expired, or already-used token all fail the same way;
    /// on success the token is consumed and the new hash is stored.
    pub async fn complete_reset(&self, token: &str, new_password: &str) -> Result<()> {
        let doc = self
            .store
            .get(PASSWORD_RESETS, token)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;
        let record: ResetTokenRecord =
            serde_json::from_value(doc).map_err(aviso_store::StoreError::from)?;

        if record.expires_at <= self.clock.now() {
            self.store.delete(PASSWORD_RESETS, token).await?;
            return Err(AuthError::InvalidResetToken);
        }

        let mut user = self
            .directory
            .find_user_by_email(&record.email)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;
        user.password_hash = Some(hash_password(new_password)?);
        self.directory.upsert_user(&user).await?;
        self.store.delete(PASSWORD_RESETS, token).await?;
        info!(email = %record.email, "password reset completed");
        Ok(())
    }
}
