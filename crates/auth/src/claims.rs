//! Session token claims
//!
//! One claims shape is used for both access and refresh tokens; refresh
//! tokens additionally carry a `jti` that is tracked by the refresh ledger.

use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// Claims carried by signed session tokens
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the account email
    #[serde(rename = "sub")]
    pub subject: String,

    /// Issued at (Unix timestamp)
    #[serde(rename = "iat")]
    pub issued_at: i64,

    /// Expiration time (Unix timestamp)
    #[serde(rename = "exp")]
    pub expires_at: i64,

    /// Token ID; present on refresh tokens, tracked by the ledger
    #[serde(rename = "jti", default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,

    /// Role name (e.g. `ADMIN`, `TEACHER`, `STUDENT`)
    #[serde(default)]
    pub role: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Tenant (school) the session is scoped to; `global` for the super-tenant
    #[serde(rename = "tenantId", default)]
    pub tenant_id: String,

    /// Human-readable tenant name
    #[serde(rename = "tenantName", default)]
    pub tenant_name: String,

    /// National identity number, when the account has one on file
    #[serde(rename = "nationalId", default, skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,

    /// Permission snapshot embedded for UI convenience; the access evaluator
    /// never trusts this list, it re-resolves from the role
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,

    /// Dependent students linked to a guardian session
    #[serde(rename = "studentIds", default, skip_serializing_if = "Vec::is_empty")]
    pub student_ids: Vec<String>,

    /// Tenants of the linked students, in the same order
    #[serde(rename = "tenantIds", default, skip_serializing_if = "Vec::is_empty")]
    pub tenant_ids: Vec<String>,
}

impl SessionClaims {
    /// The caller identity these claims describe
    pub fn identity(&self) -> Identity {
        Identity {
            email: self.subject.clone(),
            role: self.role.clone(),
            tenant_id: self.tenant_id.clone(),
            tenant_name: self.tenant_name.clone(),
            display_name: self.name.clone(),
        }
    }
}
