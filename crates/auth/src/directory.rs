//! Typed lookups over the document store
//!
//! Thin, typed wrappers around the collections the auth core reads:
//! `users` (staff/admin accounts), `students` (dependent records with
//! guardian contact lists), and `tenants` (schools). Field names below are
//! the on-disk contract; other subsystems read the same shapes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use aviso_store::{DocumentStore, Filter, Query};

use crate::error::Result;

const USERS: &str = "users";
const STUDENTS: &str = "students";
const TENANTS: &str = "tenants";

/// A registered staff/admin account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Stable account id
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Login email, stored lowercase
    pub email: String,
    /// Argon2 hash; absent for accounts that only log in via OTP
    #[serde(rename = "passwordHash", default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Role name, uppercase
    pub role: String,
    /// Tenant the account belongs to
    #[serde(rename = "tenantId", default)]
    pub tenant_id: String,
    /// Human-readable tenant name
    #[serde(rename = "tenantName", default)]
    pub tenant_name: String,
    /// National identity number, if on file
    #[serde(rename = "nationalId", default, skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
}

/// A guardian contact on a student record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Guardian {
    /// Guardian name; may be blank on imported records
    #[serde(default)]
    pub name: String,
    /// Guardian email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A dependent-student record
///
/// `guardian_emails` is a denormalized array of every guardian email on the
/// record, maintained at import time so guardian lookups are a single
/// array-membership query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentRecord {
    /// Stable student id
    pub id: String,
    /// Given name
    #[serde(rename = "firstName", default)]
    pub first_name: String,
    /// Family name
    #[serde(rename = "lastName", default)]
    pub last_name: String,
    /// Guardian contacts
    #[serde(default)]
    pub guardians: Vec<Guardian>,
    /// Lowercased guardian emails, for membership queries
    #[serde(rename = "guardianEmails", default)]
    pub guardian_emails: Vec<String>,
    /// Legacy single-guardian given name, from old imports
    #[serde(rename = "guardianFirstName", default, skip_serializing_if = "Option::is_none")]
    pub guardian_first_name: Option<String>,
    /// Legacy single-guardian family name, from old imports
    #[serde(rename = "guardianLastName", default, skip_serializing_if = "Option::is_none")]
    pub guardian_last_name: Option<String>,
    /// Tenant (school) the student is enrolled in
    #[serde(rename = "tenantId", default)]
    pub tenant_id: String,
}

impl StudentRecord {
    /// Display name for a guardian session on this record
    ///
    /// Prefers the guardian whose email matches, then the first guardian
    /// with a name, then the legacy guardian name fields, then the
    /// student's own name.
    pub fn guardian_display_name(&self, email: &str) -> String {
        if let Some(matched) = self.guardians.iter().find(|g| {
            g.email
                .as_deref()
                .is_some_and(|e| e.eq_ignore_ascii_case(email))
        }) {
            if !matched.name.trim().is_empty() {
                return matched.name.clone();
            }
        }
        if let Some(named) = self.guardians.iter().find(|g| !g.name.trim().is_empty()) {
            return named.name.clone();
        }
        let legacy = format!(
            "{} {}",
            self.guardian_first_name.as_deref().unwrap_or(""),
            self.guardian_last_name.as_deref().unwrap_or("")
        );
        let legacy = legacy.trim();
        if !legacy.is_empty() {
            return legacy.to_string();
        }
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A tenant (school) record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRecord {
    /// Tenant id
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
}

/// Typed directory over the document store
#[derive(Clone)]
pub struct Directory {
    store: Arc<dyn DocumentStore>,
}

impl Directory {
    /// Wrap a document store
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Look up a staff/admin account by (already normalized) email
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let hits = self
            .store
            .query(
                Query::collection(USERS)
                    .filter(Filter::eq("email", json!(email)))
                    .limit(1),
            )
            .await?;
        match hits.into_iter().next() {
            Some(doc) => Ok(Some(serde_json::from_value(doc).map_err(aviso_store::StoreError::from)?)),
            None => Ok(None),
        }
    }

    /// Create or replace a user record
    pub async fn upsert_user(&self, user: &UserRecord) -> Result<()> {
        let doc = serde_json::to_value(user).map_err(aviso_store::StoreError::from)?;
        self.store.set(USERS, &user.id, doc).await?;
        Ok(())
    }

    /// All dependent-student records listing the email as a guardian
    pub async fn students_by_guardian_email(&self, email: &str) -> Result<Vec<StudentRecord>> {
        let hits = self
            .store
            .query(
                Query::collection(STUDENTS)
                    .filter(Filter::contains("guardianEmails", json!(email))),
            )
            .await?;
        let mut students = Vec::with_capacity(hits.len());
        for doc in hits {
            students.push(serde_json::from_value(doc).map_err(aviso_store::StoreError::from)?);
        }
        Ok(students)
    }

    /// Display name for a tenant, if the record exists and has one
    pub async fn tenant_name(&self, tenant_id: &str) -> Result<Option<String>> {
        let Some(doc) = self.store.get(TENANTS, tenant_id).await? else {
            return Ok(None);
        };
        let tenant: TenantRecord =
            serde_json::from_value(doc).map_err(aviso_store::StoreError::from)?;
        Ok(Some(tenant.name).filter(|n| !n.trim().is_empty()))
    }
}
