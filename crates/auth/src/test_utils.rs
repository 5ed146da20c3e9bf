//! Shared fixtures for the crate's tests

use std::sync::Arc;

use serde_json::json;

use aviso_store::{DocumentStore, MemoryStore};

use crate::claims::SessionClaims;
use crate::clock::ManualClock;
use crate::config::AuthConfig;
use crate::email::RecordingMailer;
use crate::identity::Identity;
use crate::token::TokenIssuer;

/// A valid configuration with default TTLs
pub(crate) fn test_config() -> AuthConfig {
    AuthConfig {
        access_secret: "a-perfectly-fine-access-secret-!!".to_string(),
        refresh_secret: "short-refresh".to_string(),
        ..Default::default()
    }
}

/// A working issuer over a manual clock pinned at "now"
pub(crate) fn test_issuer() -> TokenIssuer {
    let clock = Arc::new(ManualClock::from_system());
    TokenIssuer::new(&test_config(), clock)
        .unwrap_or_else(|e| panic!("test issuer construction failed: {}", e))
}

/// Claims for a staff session; timestamps are stamped at issuance
pub(crate) fn test_staff_claims(email: &str, role: &str, tenant_id: &str) -> SessionClaims {
    SessionClaims {
        subject: email.to_string(),
        role: role.to_string(),
        name: "Test User".to_string(),
        tenant_id: tenant_id.to_string(),
        tenant_name: "Test School".to_string(),
        ..Default::default()
    }
}

/// An identity as the extraction layer would produce it
pub(crate) fn test_identity(email: &str, role: &str, tenant_id: &str) -> Identity {
    Identity {
        email: email.to_string(),
        role: role.to_string(),
        tenant_id: tenant_id.to_string(),
        tenant_name: "Test School".to_string(),
        display_name: "Test User".to_string(),
    }
}

/// Write a role's permission document
pub(crate) async fn seed_role(store: &MemoryStore, role: &str, permissions: &[&str]) {
    store
        .set(
            "role_permissions",
            &role.to_uppercase(),
            json!({ "permissions": permissions }),
        )
        .await
        .unwrap_or_else(|e| panic!("seeding role {} failed: {}", role, e));
}

/// The 6-digit code from the most recently recorded email
pub(crate) fn last_mailed_code(mailer: &RecordingMailer) -> String {
    let mail = mailer.last().unwrap_or_else(|| panic!("no email was sent"));
    let body = mail
        .text_body
        .unwrap_or_else(|| panic!("login code email had no text body"));
    let code: String = body.chars().filter(char::is_ascii_digit).collect();
    assert_eq!(code.len(), 6, "expected exactly one 6-digit code in: {}", body);
    code
}
