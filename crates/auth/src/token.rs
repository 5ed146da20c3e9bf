//! Token issuance and verification
//!
//! Access and refresh tokens are compact HS256-signed tokens over
//! [`SessionClaims`]. The two kinds are signed with independent secrets, so
//! a leaked access-token secret cannot be used to forge refresh tokens.
//! Refresh issuance injects a fresh random `jti` and hands it back so the
//! caller can persist it in the refresh ledger.

use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use crate::claims::SessionClaims;
use crate::clock::SharedClock;
use crate::config::{AuthConfig, MIN_SECRET_LEN};
use crate::error::{AuthError, Result};

/// Signs and verifies session tokens
pub struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
    clock: SharedClock,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Stretch secret material to the minimum HS256 key length
///
/// Short refresh secrets are run through SHA-256 once, matching the key the
/// platform has always derived for them. Secrets already long enough are
/// used as-is.
fn refresh_key_material(secret: &str) -> Vec<u8> {
    let raw = secret.as_bytes();
    if raw.len() < MIN_SECRET_LEN {
        Sha256::digest(raw).to_vec()
    } else {
        raw.to_vec()
    }
}

impl TokenIssuer {
    /// Create an issuer from validated configuration
    pub fn new(config: &AuthConfig, clock: SharedClock) -> Result<Self> {
        if config.access_secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::InvalidSecret(format!(
                "access secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }
        if config.refresh_secret.is_empty() {
            return Err(AuthError::InvalidSecret(
                "refresh secret must not be empty".to_string(),
            ));
        }

        let access_raw = config.access_secret.as_bytes();
        let refresh_raw = refresh_key_material(&config.refresh_secret);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        let access_ttl = Duration::from_std(config.access_ttl)
            .map_err(|e| AuthError::InvalidSecret(format!("access ttl out of range: {}", e)))?;
        let refresh_ttl = Duration::from_std(config.refresh_ttl)
            .map_err(|e| AuthError::InvalidSecret(format!("refresh ttl out of range: {}", e)))?;

        Ok(Self {
            access_encoding: EncodingKey::from_secret(access_raw),
            access_decoding: DecodingKey::from_secret(access_raw),
            refresh_encoding: EncodingKey::from_secret(&refresh_raw),
            refresh_decoding: DecodingKey::from_secret(&refresh_raw),
            access_ttl,
            refresh_ttl,
            validation,
            clock,
        })
    }

    /// Refresh-token lifetime, for ledger expiries
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Sign a short-lived access token
    ///
    /// Timestamps are stamped here; any `jti` on the input claims is
    /// dropped, access tokens are not tracked by the ledger.
    pub fn issue_access(&self, claims: &SessionClaims) -> Result<String> {
        let now = self.clock.now();
        let mut claims = claims.clone();
        claims.token_id = None;
        claims.issued_at = now.timestamp();
        claims.expires_at = (now + self.access_ttl).timestamp();
        self.sign(&claims, &self.access_encoding)
    }

    /// Sign a longer-lived refresh token
    ///
    /// Injects a fresh random `jti` and returns it alongside the token so
    /// the caller can record it in the refresh ledger.
    pub fn issue_refresh(&self, claims: &SessionClaims) -> Result<(String, String)> {
        let now = self.clock.now();
        let jti = Uuid::new_v4().to_string();
        let mut claims = claims.clone();
        claims.token_id = Some(jti.clone());
        claims.issued_at = now.timestamp();
        claims.expires_at = (now + self.refresh_ttl).timestamp();
        let token = self.sign(&claims, &self.refresh_encoding)?;
        Ok((token, jti))
    }

    /// Verify an access token and return its claims
    pub fn parse_access(&self, token: &str) -> Result<SessionClaims> {
        self.parse(token, &self.access_decoding)
    }

    /// Verify a refresh token and return its claims
    pub fn parse_refresh(&self, token: &str) -> Result<SessionClaims> {
        self.parse(token, &self.refresh_decoding)
    }

    fn sign(&self, claims: &SessionClaims, key: &EncodingKey) -> Result<String> {
        encode(&Header::default(), claims, key)
            .map_err(|e| AuthError::InvalidSecret(format!("failed to sign token: {}", e)))
    }

    /// All verification failures collapse to [`AuthError::InvalidToken`];
    /// callers must treat them uniformly as "unauthenticated"
    fn parse(&self, token: &str, key: &DecodingKey) -> Result<SessionClaims> {
        decode::<SessionClaims>(token, key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("token verification failed: {:?}", e.kind());
                AuthError::InvalidToken
            })
    }
}
