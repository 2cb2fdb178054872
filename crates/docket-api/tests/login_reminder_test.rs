//! Login against a real database while the reminder store is down.
//!
//! Requires a database at `DATABASE_URL`; run with `cargo test -- --ignored`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use docket_api::auth::{hash_password, verify_token};
use docket_api::{router, ApiConfig, AppState};
use docket_core::{CaseStore, CreateUserRequest, DueCase, Error, Result, SystemClock, ROLE_USER};
use docket_db::test_fixtures::connect_test;
use docket_db::FilesystemBackend;
use docket_jobs::{PresenceRegistry, ReminderEngine};

const SECRET: &str = "login-test-secret";

/// Case store whose scan always fails.
struct FailingCases;

#[axum::async_trait]
impl CaseStore for FailingCases {
    async fn due_cases(&self, _: NaiveDate, _: Option<i64>) -> Result<Vec<DueCase>> {
        Err(Error::Internal("reminder store unavailable".to_string()))
    }
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_login_succeeds_when_reminder_check_fails() {
    let db = connect_test().await;
    let email = format!("{}@login.docket", uuid::Uuid::new_v4().simple());
    let user = db
        .users
        .create(&CreateUserRequest {
            username: "login-tester".to_string(),
            email: email.clone(),
            password_hash: hash_password("rahasia1").unwrap(),
            role: ROLE_USER.to_string(),
            position: None,
            phone: None,
            office: None,
        })
        .await
        .unwrap();

    let engine = Arc::new(ReminderEngine::new(
        Arc::new(FailingCases),
        db.notifications.clone(),
        PresenceRegistry::spawn(),
        Arc::new(SystemClock),
    ));
    // The engine really is broken for this user.
    assert!(engine.check_pending_notifications(user.id).await.is_err());

    let app = router(AppState {
        db: db.clone(),
        engine,
        storage: Arc::new(FilesystemBackend::new(
            std::env::temp_dir().join("docket-login-test"),
        )),
        config: Arc::new(ApiConfig::for_tests(SECRET)),
    });

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": email, "password": "rahasia1" }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    db.users.delete(user.id).await.unwrap();

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["id"], user.id);
    let claims = verify_token(SECRET, body["token"].as_str().unwrap()).unwrap();
    assert_eq!(claims.user_id, user.id);
}
