//! Authentication service
//!
//! Orchestrates the pieces behind the four session entry points: password
//! login, token refresh, one-time-code request, and one-time-code login.
//! Everything here takes and returns plain values; transport concerns
//! (headers, status codes) live with the caller.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use aviso_store::DocumentStore;

use crate::access::AccessEvaluator;
use crate::claims::SessionClaims;
use crate::clock::SharedClock;
use crate::config::AuthConfig;
use crate::directory::Directory;
use crate::email::Mailer;
use crate::error::{AuthError, Result};
use crate::identity::{Identity, extract_identity};
use crate::ledger::RefreshLedger;
use crate::otp::{OtpService, normalize_email};
use crate::password::verify_password;
use crate::resolver::{LoginResolution, LoginResolver, ResolvedAccount, StudentOption};
use crate::token::TokenIssuer;

/// A freshly issued session
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    /// Short-lived bearer token
    #[serde(rename = "accessToken")]
    pub access_token: String,
    /// Long-lived rotation token
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    /// Session email
    pub email: String,
    /// Display name
    pub name: String,
    /// Session role
    pub role: String,
    /// Tenant the session is scoped to
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
    /// Human-readable tenant name
    #[serde(rename = "tenantName")]
    pub tenant_name: String,
    /// Linked dependent students (guardian sessions only)
    #[serde(rename = "studentIds", skip_serializing_if = "Vec::is_empty")]
    pub student_ids: Vec<String>,
}

/// Outcome of a one-time-code login attempt
#[derive(Debug, Clone)]
pub enum OtpLogin {
    /// The email resolved to one identity and a session was issued
    Session(AuthResponse),
    /// Several students match the guardian email; the client picks one and
    /// retries with the same code plus the chosen student id
    ChooseStudent(Vec<StudentOption>),
}

/// The platform's session front door
pub struct AuthService {
    issuer: TokenIssuer,
    ledger: RefreshLedger,
    otp: OtpService,
    resolver: LoginResolver,
    directory: Directory,
    access: Arc<AccessEvaluator>,
    clock: SharedClock,
}

impl AuthService {
    /// Wire up the service over a store, mailer, and clock
    pub fn new(
        store: Arc<dyn DocumentStore>,
        mailer: Arc<dyn Mailer>,
        clock: SharedClock,
        config: &AuthConfig,
    ) -> Result<Self> {
        let directory = Directory::new(store.clone());
        Ok(Self {
            issuer: TokenIssuer::new(config, clock.clone())?,
            ledger: RefreshLedger::new(store.clone(), clock.clone()),
            otp: OtpService::new(store.clone(), mailer, clock.clone(), config),
            resolver: LoginResolver::new(directory.clone(), config),
            directory,
            access: Arc::new(AccessEvaluator::new(store, clock.clone(), config)),
            clock,
        })
    }

    /// The permission gate, shared with resource endpoints
    pub fn access(&self) -> Arc<AccessEvaluator> {
        self.access.clone()
    }

    /// The token issuer, for identity extraction at the transport edge
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// The caller behind an `Authorization` header value, if any
    pub fn current_user(&self, header: Option<&str>) -> Option<Identity> {
        extract_identity(header, &self.issuer)
    }

    /// Password login
    ///
    /// Every failure is the same [`AuthError::InvalidCredentials`]; an
    /// unknown email, a missing hash, and a wrong password are
    /// indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let normalized = normalize_email(email);
        let user = self
            .directory
            .find_user_by_email(&normalized)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(password, hash) {
            return Err(AuthError::InvalidCredentials);
        }

        // Re-resolve through the login resolver so super-admin elevation
        // applies on the password path too.
        match self.resolver.resolve(&normalized, None, false).await? {
            LoginResolution::Resolved(account) => {
                info!(email = %normalized, role = %account.role, "password login");
                self.issue_session(account).await
            }
            // Unreachable with a staff record present, but not worth a panic
            LoginResolution::Ambiguous(_) => Err(AuthError::InvalidCredentials),
        }
    }

    /// Rotate a refresh token into a new session
    ///
    /// Single-use: the presented token's `jti` must still be live in the
    /// ledger, and is revoked once the replacement pair exists. New tokens
    /// are issued *before* the old record is touched; if revocation then
    /// fails the worst case is a short overlap, never a locked-out user.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse> {
        let claims = self
            .issuer
            .parse_refresh(refresh_token)
            .map_err(|_| AuthError::Unauthenticated)?;
        let old_jti = claims.token_id.clone().ok_or(AuthError::Unauthenticated)?;
        if !self.ledger.is_valid(&old_jti).await {
            return Err(AuthError::Unauthenticated);
        }

        let access_token = self.issuer.issue_access(&claims)?;
        let (refresh_token, new_jti) = self.issuer.issue_refresh(&claims)?;

        // Best-effort bookkeeping; the new pair is already valid.
        self.ledger.revoke(&old_jti).await;
        let expires_at = self.clock.now() + self.issuer.refresh_ttl();
        if let Err(e) = self.ledger.save(&new_jti, &claims.subject, expires_at).await {
            warn!(jti = %new_jti, "failed to record rotated refresh token: {}", e);
        }

        Ok(AuthResponse {
            access_token,
            refresh_token,
            email: claims.subject,
            name: claims.name,
            role: claims.role,
            tenant_id: claims.tenant_id,
            tenant_name: claims.tenant_name,
            student_ids: claims.student_ids,
        })
    }

    /// Mail a one-time login code to the address
    pub async fn request_otp(&self, email: &str) -> Result<()> {
        self.otp.request_code(email).await
    }

    /// Log in with a one-time code
    ///
    /// The code is consumed only when a session is actually issued: an
    /// ambiguous guardian match leaves it in place so the follow-up request
    /// carrying a `student_id` can present the same code again.
    pub async fn verify_otp(
        &self,
        email: &str,
        code: &str,
        student_id: Option<&str>,
        students_only: bool,
    ) -> Result<OtpLogin> {
        if !self.otp.check_code(email, code).await {
            return Err(AuthError::InvalidCredentials);
        }
        match self.resolver.resolve(email, student_id, students_only).await? {
            LoginResolution::Resolved(account) => {
                self.otp.discard_code(email).await;
                info!(email = %account.email, role = %account.role, "one-time-code login");
                Ok(OtpLogin::Session(self.issue_session(account).await?))
            }
            LoginResolution::Ambiguous(options) => Ok(OtpLogin::ChooseStudent(options)),
        }
    }

    /// Mint an access/refresh pair for a resolved account
    async fn issue_session(&self, account: ResolvedAccount) -> Result<AuthResponse> {
        let mut permissions: Vec<String> = self
            .access
            .permissions(&account.role)
            .await
            .iter()
            .cloned()
            .collect();
        permissions.sort();

        let claims = SessionClaims {
            subject: account.email.clone(),
            role: account.role.clone(),
            name: account.name.clone(),
            tenant_id: account.tenant_id.clone(),
            tenant_name: account.tenant_name.clone(),
            national_id: account.national_id,
            permissions,
            student_ids: account.student_ids.clone(),
            tenant_ids: account.tenant_ids,
            ..Default::default()
        };

        let access_token = self.issuer.issue_access(&claims)?;
        let (refresh_token, jti) = self.issuer.issue_refresh(&claims)?;
        let expires_at = self.clock.now() + self.issuer.refresh_ttl();
        if let Err(e) = self.ledger.save(&jti, &account.email, expires_at).await {
            warn!(jti = %jti, "failed to record refresh token: {}", e);
        }

        Ok(AuthResponse {
            access_token,
            refresh_token,
            email: account.email,
            name: account.name,
            role: account.role,
            tenant_id: account.tenant_id,
            tenant_name: account.tenant_name,
            student_ids: account.student_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::directory::{Guardian, StudentRecord, UserRecord};
    use crate::email::RecordingMailer;
    use crate::password::hash_password;
    use crate::test_utils::{last_mailed_code, seed_role, test_config};
    use aviso_store::MemoryStore;
    use chrono::Duration;

    struct Fixture {
        service: AuthService,
        store: Arc<MemoryStore>,
        mailer: Arc<RecordingMailer>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::new());
        let clock = Arc::new(ManualClock::from_system());
        let service = AuthService::new(
            store.clone(),
            mailer.clone(),
            clock.clone(),
            &test_config(),
        )
        .unwrap();
        Fixture {
            service,
            store,
            mailer,
            clock,
        }
    }

    async fn seed_staff(f: &Fixture, email: &str, password: &str) {
        let user = UserRecord {
            id: "u1".to_string(),
            name: "Ana Díaz".to_string(),
            email: email.to_string(),
            password_hash: Some(hash_password(password).unwrap()),
            role: "TEACHER".to_string(),
            tenant_id: "school-1".to_string(),
            tenant_name: "Escuela Uno".to_string(),
            national_id: None,
        };
        Directory::new(f.store.clone()).upsert_user(&user).await.unwrap();
    }

    async fn seed_student(f: &Fixture, id: &str, tenant: &str, guardian_email: &str) {
        let student = StudentRecord {
            id: id.to_string(),
            first_name: "Sofía".to_string(),
            last_name: "Rojas".to_string(),
            guardians: vec![Guardian {
                name: "Pedro Rojas".to_string(),
                email: Some(guardian_email.to_string()),
            }],
            guardian_emails: vec![guardian_email.to_string()],
            tenant_id: tenant.to_string(),
            ..Default::default()
        };
        f.store
            .set("students", id, serde_json::to_value(&student).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_password_login_round_trip() {
        let f = fixture();
        seed_staff(&f, "ana@x.com", "hunter2-but-long").await;
        seed_role(&f.store, "TEACHER", &["messages.list"]).await;

        let session = f.service.login("Ana@X.com ", "hunter2-but-long").await.unwrap();
        assert_eq!(session.email, "ana@x.com");
        assert_eq!(session.role, "TEACHER");
        assert_eq!(session.tenant_id, "school-1");

        // The access token verifies and carries the permission snapshot
        let header = format!("Bearer {}", session.access_token);
        let identity = f.service.current_user(Some(&header)).unwrap();
        assert_eq!(identity.email, "ana@x.com");
        let claims = f.service.issuer().parse_access(&session.access_token).unwrap();
        assert_eq!(claims.permissions, vec!["messages.list".to_string()]);
    }

    #[tokio::test]
    async fn test_password_login_failures_are_uniform() {
        let f = fixture();
        seed_staff(&f, "ana@x.com", "hunter2-but-long").await;

        for (email, password) in [
            ("nobody@x.com", "hunter2-but-long"),
            ("ana@x.com", "wrong-password"),
        ] {
            let err = f.service.login(email, password).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }
    }

    #[tokio::test]
    async fn test_login_without_stored_hash_fails() {
        let f = fixture();
        let user = UserRecord {
            id: "u1".to_string(),
            name: "Ana".to_string(),
            email: "ana@x.com".to_string(),
            password_hash: None,
            role: "TEACHER".to_string(),
            tenant_id: "school-1".to_string(),
            tenant_name: String::new(),
            national_id: None,
        };
        Directory::new(f.store.clone()).upsert_user(&user).await.unwrap();

        let err = f.service.login("ana@x.com", "anything").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_refresh_rotation_is_single_use() {
        let f = fixture();
        seed_staff(&f, "ana@x.com", "hunter2-but-long").await;
        let session = f.service.login("ana@x.com", "hunter2-but-long").await.unwrap();

        let rotated = f.service.refresh(&session.refresh_token).await.unwrap();
        assert_eq!(rotated.email, "ana@x.com");
        assert_ne!(rotated.refresh_token, session.refresh_token);

        // The original token's jti is revoked; presenting it again fails
        let err = f.service.refresh(&session.refresh_token).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));

        // The rotated token still works
        f.service.refresh(&rotated.refresh_token).await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let f = fixture();
        seed_staff(&f, "ana@x.com", "hunter2-but-long").await;
        let session = f.service.login("ana@x.com", "hunter2-but-long").await.unwrap();

        let err = f.service.refresh(&session.access_token).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_refresh_rejects_expired_ledger_record() {
        let f = fixture();
        seed_staff(&f, "ana@x.com", "hunter2-but-long").await;
        let session = f.service.login("ana@x.com", "hunter2-but-long").await.unwrap();

        f.clock.advance(Duration::days(31));
        let err = f.service.refresh(&session.refresh_token).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_otp_login_single_student() {
        let f = fixture();
        seed_student(&f, "s1", "school-1", "pedro@x.com").await;

        f.service.request_otp("pedro@x.com").await.unwrap();
        let code = last_mailed_code(&f.mailer);

        let outcome = f
            .service
            .verify_otp("pedro@x.com", &code, None, false)
            .await
            .unwrap();
        let OtpLogin::Session(session) = outcome else {
            panic!("expected a session");
        };
        assert_eq!(session.role, "STUDENT");
        assert_eq!(session.tenant_id, "school-1");
        assert_eq!(session.student_ids, vec!["s1".to_string()]);

        // Consumed on success
        let err = f
            .service
            .verify_otp("pedro@x.com", &code, None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_otp_login_ambiguous_then_retry_with_same_code() {
        let f = fixture();
        seed_student(&f, "s1", "school-1", "pedro@x.com").await;
        seed_student(&f, "s2", "school-2", "pedro@x.com").await;

        f.service.request_otp("pedro@x.com").await.unwrap();
        let code = last_mailed_code(&f.mailer);

        let outcome = f
            .service
            .verify_otp("pedro@x.com", &code, None, false)
            .await
            .unwrap();
        let OtpLogin::ChooseStudent(options) = outcome else {
            panic!("expected a student choice");
        };
        assert_eq!(options.len(), 2);

        // Same code, now with a concrete choice
        let outcome = f
            .service
            .verify_otp("pedro@x.com", &code, Some("s2"), false)
            .await
            .unwrap();
        let OtpLogin::Session(session) = outcome else {
            panic!("expected a session");
        };
        assert_eq!(session.tenant_id, "school-2");
    }

    #[tokio::test]
    async fn test_otp_wrong_code_rejected() {
        let f = fixture();
        seed_student(&f, "s1", "school-1", "pedro@x.com").await;
        f.service.request_otp("pedro@x.com").await.unwrap();
        let code = last_mailed_code(&f.mailer);
        let wrong = if code == "000000" { "000001" } else { "000000" };

        let err = f
            .service
            .verify_otp("pedro@x.com", wrong, None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_otp_unassociated_email() {
        let f = fixture();
        f.service.request_otp("ghost@x.com").await.unwrap();
        let code = last_mailed_code(&f.mailer);

        let err = f
            .service
            .verify_otp("ghost@x.com", &code, None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotAssociated));
    }

    #[tokio::test]
    async fn test_current_user_absent_header() {
        let f = fixture();
        assert!(f.service.current_user(None).is_none());
        assert!(f.service.current_user(Some("Bearer junk")).is_none());
    }
}
