//! End-to-end flows over the assembled service

use std::sync::Arc;

use chrono::Duration;
use serde_json::json;

use aviso_store::{DocumentStore, MemoryStore};

use crate::clock::ManualClock;
use crate::directory::{Directory, Guardian, StudentRecord, UserRecord};
use crate::email::RecordingMailer;
use crate::error::AuthError;
use crate::password::hash_password;
use crate::service::{AuthService, OtpLogin};
use crate::test_utils::{last_mailed_code, seed_role, test_config};

struct Platform {
    service: AuthService,
    store: Arc<MemoryStore>,
    mailer: Arc<RecordingMailer>,
    clock: Arc<ManualClock>,
}

fn platform() -> Platform {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    let clock = Arc::new(ManualClock::from_system());
    let service = AuthService::new(store.clone(), mailer.clone(), clock.clone(), &test_config())
        .expect("service construction");
    Platform {
        service,
        store,
        mailer,
        clock,
    }
}

async fn seed_teacher(p: &Platform, email: &str, password: &str, tenant: &str) {
    let user = UserRecord {
        id: format!("u-{}", email),
        name: "Ana Díaz".to_string(),
        email: email.to_string(),
        password_hash: Some(hash_password(password).unwrap()),
        role: "TEACHER".to_string(),
        tenant_id: tenant.to_string(),
        tenant_name: "Escuela Uno".to_string(),
        national_id: None,
    };
    Directory::new(p.store.clone()).upsert_user(&user).await.unwrap();
}

async fn seed_student(p: &Platform, id: &str, tenant: &str, guardian_email: &str) {
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
    p.store
        .set("students", id, serde_json::to_value(&student).unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_login_then_gate_a_tenant_operation() {
    let p = platform();
    seed_teacher(&p, "ana@x.com", "correct-horse-battery", "school-1").await;
    seed_role(&p.store, "TEACHER", &["messages.send", "grades.read.self"]).await;

    let session = p.service.login("ana@x.com", "correct-horse-battery").await.unwrap();
    let header = format!("Bearer {}", session.access_token);
    let identity = p.service.current_user(Some(&header)).unwrap();
    let access = p.service.access();

    // Own tenant, held permission
    access
        .check(Some(&identity), "messages.send", Some("school-1"), None)
        .await
        .unwrap();

    // Cross-tenant fails even though the permission is held
    assert!(access
        .check(Some(&identity), "messages.send", Some("school-2"), None)
        .await
        .is_err());

    // Self-scoped permission honors ownership
    access
        .check(Some(&identity), "grades.read", Some("school-1"), Some("ANA@x.com"))
        .await
        .unwrap();
    assert!(access
        .check(Some(&identity), "grades.read", Some("school-1"), Some("someone@x.com"))
        .await
        .is_err());
}

#[tokio::test]
async fn test_guardian_journey_request_choose_refresh() {
    let p = platform();
    seed_student(&p, "s1", "school-1", "pedro@x.com").await;
    seed_student(&p, "s2", "school-2", "pedro@x.com").await;

    p.service.request_otp("Pedro@X.com ").await.unwrap();
    let code = last_mailed_code(&p.mailer);

    // First attempt: two children, must choose
    let outcome = p.service.verify_otp("pedro@x.com", &code, None, false).await.unwrap();
    let OtpLogin::ChooseStudent(options) = outcome else {
        panic!("expected a student choice");
    };
    assert_eq!(options.len(), 2);

    // Retry with a choice mints a session scoped to that child's school
    let outcome = p
        .service
        .verify_otp("pedro@x.com", &code, Some(&options[1].student_id), false)
        .await
        .unwrap();
    let OtpLogin::Session(session) = outcome else {
        panic!("expected a session");
    };
    assert_eq!(session.role, "STUDENT");
    assert_eq!(session.tenant_id, options[1].tenant_id);

    // The session refreshes like any other
    let rotated = p.service.refresh(&session.refresh_token).await.unwrap();
    assert_eq!(rotated.tenant_id, session.tenant_id);
    assert!(matches!(
        p.service.refresh(&session.refresh_token).await,
        Err(AuthError::Unauthenticated)
    ));
}

#[tokio::test]
async fn test_permission_edits_apply_after_cache_ttl() {
    let p = platform();
    seed_teacher(&p, "ana@x.com", "correct-horse-battery", "school-1").await;
    seed_role(&p.store, "TEACHER", &["messages.send"]).await;

    let session = p.service.login("ana@x.com", "correct-horse-battery").await.unwrap();
    let header = format!("Bearer {}", session.access_token);
    let identity = p.service.current_user(Some(&header)).unwrap();
    let access = p.service.access();

    access
        .check(Some(&identity), "messages.send", Some("school-1"), None)
        .await
        .unwrap();

    // Revoke the permission in the store; the cached set keeps answering
    p.store
        .set("role_permissions", "TEACHER", json!({"permissions": []}))
        .await
        .unwrap();
    access
        .check(Some(&identity), "messages.send", Some("school-1"), None)
        .await
        .unwrap();

    p.clock.advance(Duration::seconds(301));
    assert!(access
        .check(Some(&identity), "messages.send", Some("school-1"), None)
        .await
        .is_err());
}

#[tokio::test]
async fn test_super_admin_crosses_tenants() {
    let config = crate::config::AuthConfig {
        super_admin_email: Some("root@x.com".to_string()),
        ..test_config()
    };
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    let clock = Arc::new(ManualClock::from_system());
    let service = AuthService::new(store.clone(), mailer.clone(), clock, &config).unwrap();

    seed_student_raw(&store, "s1", "school-1", "root@x.com").await;

    // The super admin has no user record; OTP login creates and elevates one
    service.request_otp("root@x.com").await.unwrap();
    let code = last_mailed_code(&mailer);
    let outcome = service.verify_otp("root@x.com", &code, None, false).await.unwrap();
    let OtpLogin::Session(session) = outcome else {
        panic!("expected a session");
    };
    assert_eq!(session.role, "ADMIN");
    assert_eq!(session.tenant_id, "global");

    // Global tenant bypasses every check, with no role document at all
    let header = format!("Bearer {}", session.access_token);
    let identity = service.current_user(Some(&header)).unwrap();
    service
        .access()
        .check(Some(&identity), "anything", Some("school-7"), None)
        .await
        .unwrap();
}

async fn seed_student_raw(store: &MemoryStore, id: &str, tenant: &str, guardian_email: &str) {
    let student = StudentRecord {
        id: id.to_string(),
        guardian_emails: vec![guardian_email.to_string()],
        tenant_id: tenant.to_string(),
        ..Default::default()
    };
    store
        .set("students", id, serde_json::to_value(&student).unwrap())
        .await
        .unwrap();
}
