mod common;

use std::sync::atomic::Ordering;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::{Duration, Utc};
use serde_json::json;

use common::{TestApp, ADMIN_EMAIL};
use interviewprep::{
    db::UserExt,
    error::ErrorMessage,
    models::UserRole,
};

#[tokio::test]
async fn signup_verify_and_login() {
    let app = TestApp::new();

    let reply = app
        .post(
            "/api/auth/signup",
            None,
            json!({ "email": "New.Student@Example.com", "password": "pa55word", "role": "student" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["status"], "success");

    let early = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "new.student@example.com", "password": "pa55word" }),
        )
        .await;
    assert_eq!(early.status, StatusCode::FORBIDDEN);
    assert_eq!(early.body["message"], ErrorMessage::EmailNotVerified.to_str());

    let code = app.mailer.last_code("new.student@example.com");
    let verified = app
        .post(
            "/api/auth/verify-otp",
            None,
            json!({ "email": "new.student@example.com", "otp": code }),
        )
        .await;
    assert_eq!(verified.status, StatusCode::OK);
    assert_eq!(verified.body["user"]["role"], "STUDENT");
    let cookie = verified.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));

    let wrong = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "new.student@example.com", "password": "nope" }),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::BAD_REQUEST);

    let login = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "new.student@example.com", "password": "pa55word" }),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["dashboardPath"], "/student/dashboard");

    let token = login.body["token"].as_str().unwrap();
    let me = app
        .send(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::COOKIE, format!("token={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["user"]["email"], "new.student@example.com");
    assert!(me.body["data"]["user"].get("password").is_none());

    assert!(app
        .mailer
        .sent
        .lock()
        .iter()
        .any(|e| e.subject.starts_with("Welcome")));
}

#[tokio::test]
async fn duplicate_signup_of_verified_user_conflicts() {
    let app = TestApp::new();
    app.register("taken@example.com", "STUDENT").await;

    let reply = app
        .post(
            "/api/auth/signup",
            None,
            json!({ "email": "taken@example.com", "password": "whatever", "role": "INTERVIEWER" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn admin_role_cannot_be_requested_directly() {
    let app = TestApp::new();
    let reply = app
        .post(
            "/api/auth/signup",
            None,
            json!({ "email": "sneaky@example.com", "password": "whatever", "role": "ADMIN" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], ErrorMessage::InvalidSignupRole.to_str());
}

#[tokio::test]
async fn admin_emails_are_promoted() {
    let app = TestApp::new();
    app.admin().await;

    let user = app
        .store
        .get_user(None, Some(ADMIN_EMAIL))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.role, UserRole::Admin);
}

#[tokio::test]
async fn expired_code_is_rejected_even_when_correct() {
    let app = TestApp::new();
    app.post(
        "/api/auth/signup",
        None,
        json!({ "email": "late@example.com", "password": "pa55word", "role": "STUDENT" }),
    )
    .await;
    let code = app.mailer.last_code("late@example.com");

    let sent_at = Utc::now() - Duration::minutes(11);
    app.store
        .refresh_pending_otp(
            "late@example.com",
            &code,
            sent_at,
            sent_at + Duration::minutes(10),
        )
        .await
        .unwrap();

    let reply = app
        .post(
            "/api/auth/verify-otp",
            None,
            json!({ "email": "late@example.com", "otp": code }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], ErrorMessage::OtpExpired.to_str());
    assert!(app
        .store
        .get_user(None, Some("late@example.com"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn wrong_code_is_rejected() {
    let app = TestApp::new();
    app.post(
        "/api/auth/signup",
        None,
        json!({ "email": "typo@example.com", "password": "pa55word", "role": "STUDENT" }),
    )
    .await;
    let code = app.mailer.last_code("typo@example.com");
    let wrong = if code == "111111" { "222222" } else { "111111" };

    let reply = app
        .post(
            "/api/auth/verify-otp",
            None,
            json!({ "email": "typo@example.com", "otp": wrong }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], ErrorMessage::InvalidOtp.to_str());
}

#[tokio::test]
async fn resend_is_rate_limited() {
    let app = TestApp::new();
    app.post(
        "/api/auth/signup",
        None,
        json!({ "email": "eager@example.com", "password": "pa55word", "role": "STUDENT" }),
    )
    .await;

    let reply = app
        .post(
            "/api/auth/resend-otp",
            None,
            json!({ "email": "eager@example.com" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::TOO_MANY_REQUESTS);

    let pending = app
        .store
        .get_pending_user("eager@example.com")
        .await
        .unwrap()
        .unwrap();
    let sent_at = Utc::now() - Duration::minutes(2);
    app.store
        .refresh_pending_otp(
            "eager@example.com",
            &pending.otp,
            sent_at,
            sent_at + Duration::minutes(10),
        )
        .await
        .unwrap();

    let reply = app
        .post(
            "/api/auth/resend-otp",
            None,
            json!({ "email": "eager@example.com" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        app.mailer
            .sent
            .lock()
            .iter()
            .filter(|e| e.to == "eager@example.com")
            .count(),
        2
    );
}

#[tokio::test]
async fn repeated_signup_respects_the_resend_cooldown() {
    let app = TestApp::new();
    let signup = json!({ "email": "again@example.com", "password": "pa55word", "role": "STUDENT" });
    let sent_to = |app: &TestApp| {
        app.mailer
            .sent
            .lock()
            .iter()
            .filter(|e| e.to == "again@example.com")
            .count()
    };

    let first = app.post("/api/auth/signup", None, signup.clone()).await;
    assert_eq!(first.status, StatusCode::CREATED);

    for _ in 0..3 {
        let reply = app.post("/api/auth/signup", None, signup.clone()).await;
        assert_eq!(reply.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(reply.body["message"], ErrorMessage::OtpResendTooSoon.to_str());
    }
    assert_eq!(sent_to(&app), 1);

    let pending = app
        .store
        .get_pending_user("again@example.com")
        .await
        .unwrap()
        .unwrap();
    let sent_at = Utc::now() - Duration::minutes(2);
    app.store
        .refresh_pending_otp(
            "again@example.com",
            &pending.otp,
            sent_at,
            sent_at + Duration::minutes(10),
        )
        .await
        .unwrap();

    let later = app.post("/api/auth/signup", None, signup).await;
    assert_eq!(later.status, StatusCode::CREATED);
    assert_eq!(sent_to(&app), 2);
}

#[tokio::test]
async fn resend_without_signup_is_not_found() {
    let app = TestApp::new();
    let reply = app
        .post(
            "/api/auth/resend-otp",
            None,
            json!({ "email": "ghost@example.com" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mail_failure_keeps_the_pending_signup() {
    let app = TestApp::new();
    app.mailer.fail.store(true, Ordering::SeqCst);

    let reply = app
        .post(
            "/api/auth/signup",
            None,
            json!({ "email": "offline@example.com", "password": "pa55word", "role": "STUDENT" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body["status"], "error");

    assert!(app
        .store
        .get_pending_user("offline@example.com")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = TestApp::new();
    let reply = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"email\":"))
                .unwrap(),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["status"], "fail");
}

#[tokio::test]
async fn logout_clears_the_cookie() {
    let app = TestApp::new();
    let reply = app
        .request(Method::POST, "/api/auth/logout", None, None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let cookie = reply.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("token=;"));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::new();
    let reply = app
        .request(Method::GET, "/api/student/sessions", None, None)
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = app.get("/api/auth/me", "not-a-jwt").await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}
