#![allow(dead_code)]

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, SecondsFormat, Utc};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use interviewprep::{
    config::{Config, MailBackend, MailConfig},
    create_router,
    db::MemoryStore,
    mail::{MailError, Mailer, OutgoingEmail},
    services::booking::AssignmentPolicy,
    AppState,
};

pub const ADMIN_EMAIL: &str = "admin@example.com";

#[derive(Default)]
pub struct CapturingMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Smtp("connection refused".to_string()));
        }
        self.sent.lock().push(email);
        Ok(())
    }
}

impl CapturingMailer {
    /// Code from the latest verification email sent to `to`.
    pub fn last_code(&self, to: &str) -> String {
        let sent = self.sent.lock();
        let email = sent
            .iter()
            .rev()
            .find(|e| e.to == to && e.subject.starts_with("Verify"))
            .expect("no verification email sent");
        let start = email.text.find("code is: ").expect("code missing") + "code is: ".len();
        email.text[start..start + 6].to_string()
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<CapturingMailer>,
    pub upload_dir: TempDir,
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub fn config(upload_dir: PathBuf) -> Config {
    Config {
        port: 0,
        database_url: None,
        jwt_secret: "test-secret".to_string(),
        jwt_maxage: 60,
        cookie_secure: false,
        frontend_origin: "http://localhost:3000".to_string(),
        admin_emails: vec![ADMIN_EMAIL.to_string()],
        upload_dir,
        assignment_policy: AssignmentPolicy::LeastLoaded,
        mail: MailConfig {
            backend: MailBackend::Log,
            app_name: "InterviewPrep Live".to_string(),
            smtp_host: "localhost".to_string(),
            smtp_port: 2525,
            smtp_user: None,
            smtp_password: None,
        },
    }
}

/// Future instant `hours` from now, truncated to whole seconds.
pub fn hours_from_now(hours: i64) -> String {
    (Utc::now() + Duration::hours(hours)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl TestApp {
    pub fn new() -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(CapturingMailer::default());
        let state = AppState {
            env: config(upload_dir.path().to_path_buf()),
            db_client: store.clone(),
            mailer: mailer.clone(),
        };

        TestApp {
            router: create_router(Arc::new(state)),
            store,
            mailer,
            upload_dir,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        Reply {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: &str) -> Reply {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Reply {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Signs up, verifies and returns the session token.
    pub async fn register(&self, email: &str, role: &str) -> String {
        let reply = self
            .post(
                "/api/auth/signup",
                None,
                json!({ "email": email, "password": "correct horse", "role": role }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);

        let code = self.mailer.last_code(email);
        let reply = self
            .post(
                "/api/auth/verify-otp",
                None,
                json!({ "email": email, "otp": code }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);

        reply.body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin(&self) -> String {
        self.register(ADMIN_EMAIL, "STUDENT").await
    }

    pub async fn student(&self, email: &str) -> String {
        let token = self.register(email, "STUDENT").await;
        let reply = self
            .post(
                "/api/student/profile",
                Some(&token),
                json!({ "name": "Sam Student", "targetRole": "Backend Engineer" }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        token
    }

    /// Registers an interviewer with a profile; returns `(token, profile_id)`.
    pub async fn interviewer(&self, email: &str, offers: &[&str]) -> (String, String) {
        let token = self.register(email, "INTERVIEWER").await;
        let reply = self
            .post(
                "/api/interviewer/profile",
                Some(&token),
                json!({
                    "name": "Ivy Interviewer",
                    "companies": ["Acme"],
                    "yearsOfExperience": 6,
                    "rolesSupported": ["Backend Engineer"],
                    "difficultyLevels": ["MEDIUM", "HARD"],
                    "sessionTypesOffered": offers,
                }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        assert_eq!(reply.body["data"]["profile"]["status"], "PENDING");

        let id = reply.body["data"]["profile"]["id"]
            .as_str()
            .unwrap()
            .to_string();
        (token, id)
    }

    pub async fn set_status(&self, admin: &str, interviewer_id: &str, status: &str) -> Reply {
        self.request(
            Method::PATCH,
            "/api/admin/interviewers",
            Some(admin),
            Some(json!({ "interviewerId": interviewer_id, "status": status })),
        )
        .await
    }

    pub async fn approved_interviewer(&self, admin: &str, email: &str, offers: &[&str]) -> (String, String) {
        let (token, id) = self.interviewer(email, offers).await;
        let reply = self.set_status(admin, &id, "APPROVED").await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        (token, id)
    }
}
