//! Aviso - Authentication
//!
//! Authentication and tenant-scoped authorization for the notification
//! platform.
//!
//! # Overview
//!
//! Two ways in, one identity out:
//!
//! | Entry point | Who uses it |
//! |-------------|-------------|
//! | Password login | School staff and admins |
//! | One-time emailed code | Guardians (and anyone else, passwordless) |
//!
//! Both produce an HS256 access/refresh token pair. Access tokens are
//! verified statelessly on every request and projected into an
//! [`Identity`]; refresh tokens are single-use, tracked by `jti` in a
//! revocable ledger and rotated on every use.
//!
//! Authorization is tenant-scoped RBAC: every gated operation names a
//! permission and a target tenant, and [`AccessEvaluator::check`] enforces
//! the tenant boundary before it ever looks at the permission. The
//! `global` super-tenant bypasses both.
//!
//! Everything is explicit: operations take the caller's [`Identity`] as a
//! parameter, clocks are injected, and the backing store is the
//! `aviso-store` document contract.

mod access;
mod claims;
mod clock;
mod config;
mod directory;
mod email;
mod error;
mod identity;
mod ledger;
mod otp;
pub mod password;
mod reset;
mod resolver;
mod service;
mod token;

#[cfg(test)]
pub(crate) mod test_utils;

#[cfg(test)]
mod flow_test;

pub use error::{AuthError, Result};

// Tokens and claims
pub use claims::SessionClaims;
pub use token::TokenIssuer;

// Caller identity
pub use identity::{GLOBAL_TENANT, Identity, ROLE_ADMIN, ROLE_STUDENT, extract_identity};

// Authorization
pub use access::{AccessEvaluator, SELF_SUFFIX, WILDCARD};

// Refresh ledger
pub use ledger::{RefreshLedger, RefreshTokenRecord};

// One-time codes and login resolution
pub use otp::{OneTimeCodeRecord, OtpService};
pub use resolver::{LoginResolution, LoginResolver, ResolvedAccount, StudentOption};

// Directory records
pub use directory::{Directory, Guardian, StudentRecord, TenantRecord, UserRecord};

// Outbound email contract
pub use email::{Mailer, NoopMailer, RecordingMailer, SentEmail};

// Orchestration
pub use reset::PasswordResetService;
pub use service::{AuthResponse, AuthService, OtpLogin};

// Configuration and time
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{AuthConfig, MIN_SECRET_LEN};
