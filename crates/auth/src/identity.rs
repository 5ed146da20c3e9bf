//! Caller identity
//!
//! An [`Identity`] is reconstructed from the bearer token on every request
//! and passed explicitly to whatever needs it. Nothing in this crate reads
//! ambient request state.

use crate::token::TokenIssuer;

/// Tenant id of the platform super-tenant; identities scoped to it bypass
/// tenant checks entirely
pub const GLOBAL_TENANT: &str = "global";

/// Role the platform grants super admins
pub const ROLE_ADMIN: &str = "ADMIN";

/// Role synthesized for guardian/student OTP sessions
pub const ROLE_STUDENT: &str = "STUDENT";

/// Authorization scheme prefix expected on the header value
const BEARER_PREFIX: &str = "Bearer ";

/// The authenticated caller, derived per request and never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Account email (token subject)
    pub email: String,
    /// Role name
    pub role: String,
    /// Tenant the caller may act within; `global` means unrestricted
    pub tenant_id: String,
    /// Human-readable tenant name
    pub tenant_name: String,
    /// Display name
    pub display_name: String,
}

impl Identity {
    /// Whether this identity belongs to the platform super-tenant
    pub fn is_global(&self) -> bool {
        self.tenant_id.eq_ignore_ascii_case(GLOBAL_TENANT)
    }
}

/// Reconstruct the caller identity from an `Authorization` header value
///
/// Returns `None` for a missing header, a non-bearer scheme, or any token
/// that fails verification. The reason is intentionally not reported;
/// callers treat every failure the same way, as "unauthenticated".
pub fn extract_identity(header: Option<&str>, issuer: &TokenIssuer) -> Option<Identity> {
    let token = header?.strip_prefix(BEARER_PREFIX)?;
    let claims = issuer.parse_access(token).ok()?;
    Some(claims.identity())
}
