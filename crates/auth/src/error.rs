//! Authentication and authorization error types

use thiserror::Error;

use aviso_store::StoreError;

/// Result type for auth operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur during authentication and authorization
///
/// Message wording is part of the contract: [`AuthError::Unauthenticated`]
/// and [`AuthError::InvalidToken`] deliberately carry no detail about *why*
/// a credential failed, so responses cannot be used as an oracle.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No valid session; surfaced as "not logged in" with no further detail
    #[error("not logged in")]
    Unauthenticated,

    /// Email or password did not match a registered account
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Authenticated but not permitted; the reason is human-readable and
    /// never enumerates the caller's permission set
    #[error("{reason}")]
    Forbidden {
        /// Human-readable denial reason
        reason: String,
    },

    /// Token failed signature, structure, or expiry checks
    #[error("invalid token")]
    InvalidToken,

    /// Verified email maps to no staff account and no dependent students
    #[error("email is not associated with any account")]
    NotAssociated,

    /// Password-reset token is missing, already used, or expired
    #[error("invalid or expired reset token")]
    InvalidResetToken,

    /// No account registered for the given email
    #[error("no account for that email")]
    UnknownUser,

    /// Signing or key-derivation configuration is unusable
    #[error("invalid secret material: {0}")]
    InvalidSecret(String),

    /// Password hashing failed
    #[error("password hashing error: {0}")]
    PasswordHash(String),

    /// Backing store failure on a primary operation
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Create a Forbidden error with a reason
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }
}
