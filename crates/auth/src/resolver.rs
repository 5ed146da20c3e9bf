//! Login resolution
//!
//! After a one-time code verifies, this decides *who* logged in. A staff
//! or admin account registered under the email wins outright; otherwise
//! the email is treated as a guardian address and matched against
//! dependent-student records. One guardian email may cover several
//! students, so resolution is a tagged outcome rather than a plain
//! identity: the ambiguous case carries the candidate list and the client
//! retries with a concrete student id.

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::directory::{Directory, StudentRecord, UserRecord};
use crate::error::{AuthError, Result};
use crate::identity::{GLOBAL_TENANT, ROLE_ADMIN, ROLE_STUDENT};
use crate::otp::normalize_email;

/// One candidate when a guardian email matches several students
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StudentOption {
    /// Student record id to re-submit with
    #[serde(rename = "studentId")]
    pub student_id: String,
    /// Name to show for this choice
    #[serde(rename = "guardianDisplayName")]
    pub guardian_display_name: String,
    /// Tenant the session would be scoped to
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
}

/// Everything needed to build session claims for a resolved login
#[derive(Debug, Clone)]
pub struct ResolvedAccount {
    /// Normalized login email
    pub email: String,
    /// Display name
    pub name: String,
    /// Session role
    pub role: String,
    /// Tenant the session is scoped to
    pub tenant_id: String,
    /// Human-readable tenant name
    pub tenant_name: String,
    /// National identity number, if on file
    pub national_id: Option<String>,
    /// Linked dependent students (guardian sessions only)
    pub student_ids: Vec<String>,
    /// Tenants of the linked students, in the same order
    pub tenant_ids: Vec<String>,
}

/// Outcome of resolving a verified login email
#[derive(Debug, Clone)]
pub enum LoginResolution {
    /// Exactly one identity; proceed to token issuance
    Resolved(ResolvedAccount),
    /// Several students match; the client must pick one and retry
    Ambiguous(Vec<StudentOption>),
}

/// Maps a verified email to a session identity
#[derive(Clone)]
pub struct LoginResolver {
    directory: Directory,
    super_admin_email: Option<String>,
}

impl LoginResolver {
    /// Create a resolver over the directory
    pub fn new(directory: Directory, config: &AuthConfig) -> Self {
        Self {
            directory,
            super_admin_email: config.super_admin_email(),
        }
    }

    /// Resolve a verified email to an identity
    ///
    /// `student_id` narrows a multi-student guardian match; an id that
    /// matches none of the candidates is ignored rather than rejected, the
    /// caller just sees the full candidate list again. `students_only`
    /// skips the staff-account lookup so a guardian who also works at a
    /// school can still open a guardian session.
    pub async fn resolve(
        &self,
        email: &str,
        student_id: Option<&str>,
        students_only: bool,
    ) -> Result<LoginResolution> {
        let email = normalize_email(email);

        if !students_only {
            if let Some(user) = self.find_staff_account(&email).await? {
                return Ok(LoginResolution::Resolved(ResolvedAccount {
                    email: user.email,
                    name: user.name,
                    role: user.role,
                    tenant_id: user.tenant_id,
                    tenant_name: user.tenant_name,
                    national_id: user.national_id,
                    student_ids: Vec::new(),
                    tenant_ids: Vec::new(),
                }));
            }
        }

        let mut students = self.directory.students_by_guardian_email(&email).await?;
        students.dedup_by(|a, b| a.id == b.id);
        if students.is_empty() {
            return Err(AuthError::NotAssociated);
        }

        if let Some(wanted) = student_id.map(str::trim).filter(|s| !s.is_empty()) {
            if let Some(chosen) = students.iter().position(|s| s.id == wanted) {
                let student = students.swap_remove(chosen);
                return Ok(LoginResolution::Resolved(
                    self.guardian_account(&email, student).await?,
                ));
            }
        }

        if students.len() > 1 {
            let options = students
                .iter()
                .map(|s| StudentOption {
                    student_id: s.id.clone(),
                    guardian_display_name: s.guardian_display_name(&email),
                    tenant_id: s.tenant_id.clone(),
                })
                .collect();
            return Ok(LoginResolution::Ambiguous(options));
        }

        let student = students.remove(0);
        Ok(LoginResolution::Resolved(
            self.guardian_account(&email, student).await?,
        ))
    }

    /// Staff/admin lookup, including super-admin elevation
    async fn find_staff_account(&self, email: &str) -> Result<Option<UserRecord>> {
        let found = self.directory.find_user_by_email(email).await?;
        if !self.is_super_admin(email) {
            return Ok(found);
        }

        // The configured super admin is always a global platform admin,
        // whatever the stored record says. The correction is persisted so
        // directory reads elsewhere agree with issued sessions.
        let mut user = found.unwrap_or_else(|| UserRecord {
            id: Uuid::new_v4().to_string(),
            name: "Platform Admin".to_string(),
            email: email.to_string(),
            password_hash: None,
            role: String::new(),
            tenant_id: String::new(),
            tenant_name: String::new(),
            national_id: None,
        });
        if user.role != ROLE_ADMIN || !user.tenant_id.eq_ignore_ascii_case(GLOBAL_TENANT) {
            user.role = ROLE_ADMIN.to_string();
            user.tenant_id = GLOBAL_TENANT.to_string();
            user.tenant_name = "Global".to_string();
            self.directory.upsert_user(&user).await?;
            info!(email, "elevated configured super admin to global tenant");
        }
        Ok(Some(user))
    }

    /// Whether the email is the configured super admin
    pub(crate) fn is_super_admin(&self, email: &str) -> bool {
        self.super_admin_email
            .as_deref()
            .is_some_and(|sa| sa == email)
    }

    /// Synthesize a guardian session scoped to one student
    async fn guardian_account(&self, email: &str, student: StudentRecord) -> Result<ResolvedAccount> {
        let tenant_name = self
            .directory
            .tenant_name(&student.tenant_id)
            .await?
            .unwrap_or_default();
        Ok(ResolvedAccount {
            email: email.to_string(),
            name: student.guardian_display_name(email),
            role: ROLE_STUDENT.to_string(),
            tenant_id: student.tenant_id.clone(),
            tenant_name,
            national_id: None,
            student_ids: vec![student.id],
            tenant_ids: vec![student.tenant_id],
        })
    }
}
