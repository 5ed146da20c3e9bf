//! Refresh-token ledger
//!
//! Every issued refresh token is tracked by its `jti` in the
//! `refresh_tokens` collection. Rotation revokes the old record and writes
//! the new one; records are never deleted, so revocations stay auditable.
//! Ownership is not checked here; callers compare the record owner against
//! the token subject before trusting it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use aviso_store::DocumentStore;

use crate::clock::SharedClock;
use crate::error::Result;

const REFRESH_TOKENS: &str = "refresh_tokens";

/// Persisted state of one refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    /// Token id (`jti` claim)
    pub id: String,
    /// Email the token was issued to
    #[serde(rename = "ownerEmail")]
    pub owner_email: String,
    /// When the token was issued
    #[serde(rename = "issuedAt")]
    pub issued_at: DateTime<Utc>,
    /// When the token expires
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
    /// Whether the token has been revoked
    #[serde(default)]
    pub revoked: bool,
}

/// Revocable ledger of issued refresh tokens
#[derive(Clone)]
pub struct RefreshLedger {
    store: Arc<dyn DocumentStore>,
    clock: SharedClock,
}

impl RefreshLedger {
    /// Create a ledger over the given store
    pub fn new(store: Arc<dyn DocumentStore>, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Record a freshly issued refresh token
    pub async fn save(&self, jti: &str, owner_email: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let record = RefreshTokenRecord {
            id: jti.to_string(),
            owner_email: owner_email.to_string(),
            issued_at: self.clock.now(),
            expires_at,
            revoked: false,
        };
        let doc = serde_json::to_value(&record).map_err(aviso_store::StoreError::from)?;
        self.store.set(REFRESH_TOKENS, jti, doc).await?;
        Ok(())
    }

    /// Whether a token id is live: known, not revoked, not expired
    ///
    /// A missing record is simply "not valid", never an error. Store
    /// failures also answer "not valid" — a refresh attempt must not
    /// succeed on the strength of a lookup that never completed.
    pub async fn is_valid(&self, jti: &str) -> bool {
        let doc = match self.store.get(REFRESH_TOKENS, jti).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return false,
            Err(e) => {
                debug!(jti, "refresh ledger lookup failed: {}", e);
                return false;
            }
        };
        let Ok(record) = serde_json::from_value::<RefreshTokenRecord>(doc) else {
            return false;
        };
        !record.revoked && record.expires_at > self.clock.now()
    }

    /// Mark a token id revoked; idempotent, and quiet about unknown ids
    pub async fn revoke(&self, jti: &str) {
        if let Err(e) = self
            .store
            .update(REFRESH_TOKENS, jti, json!({"revoked": true}))
            .await
        {
            debug!(jti, "refresh token revoke skipped: {}", e);
        }
    }
}
