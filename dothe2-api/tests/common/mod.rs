//! Common test utilities for the HTTP tests
//!
//! Builds the full router over an in-memory store, a manual clock and a
//! notifier that keeps every message, so tests can read the code and magic
//! link out of the "sent" email.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use dothe2_api::app::{build_router, AppState};
use dothe2_api::config::Config;
use dothe2_shared::auth::secret::OsSecretSource;
use dothe2_shared::clock::ManualClock;
use dothe2_shared::notify::{Notification, NotificationSender, NotifyError};
use dothe2_shared::services::Services;
use dothe2_shared::store::memory::MemoryStore;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";
pub const PUBLIC_BASE_URL: &str = "http://api.test";
pub const FRONTEND_URL: &str = "http://app.test";

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn last_for(&self, recipient: &str) -> Option<Notification> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|n| n.recipient == recipient)
            .cloned()
    }
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct TestContext {
    pub app: Router,
    pub store: MemoryStore,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestContext {
    /// Router with seeded default quadrants
    pub async fn new() -> Self {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DATABASE_URL", "postgresql://unused/dothe2"),
            ("JWT_SECRET", JWT_SECRET),
            ("PUBLIC_BASE_URL", PUBLIC_BASE_URL),
            ("FRONTEND_URL", FRONTEND_URL),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
            .expect("test config");

        let store = MemoryStore::default();
        let clock = Arc::new(ManualClock::starting_now());
        let notifier = Arc::new(RecordingNotifier::default());

        let services = Services::new(
            Arc::new(store.clone()),
            notifier.clone(),
            Arc::new(OsSecretSource),
            clock.clone(),
            config.token_policy().expect("token policy"),
        );
        services
            .quadrants
            .seed_defaults()
            .await
            .expect("seed defaults");

        Self {
            app: build_router(AppState::new(services, config)),
            store,
            clock,
            notifier,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        self.send(build(uri, "GET", token, None)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Response {
        self.send(build(uri, "DELETE", Some(token), None)).await
    }

    pub async fn json(&self, method: &str, uri: &str, token: Option<&str>, body: Value) -> Response {
        self.send(build(uri, method, token, Some(body))).await
    }

    /// Requests a login for `email` and returns the code from the email
    pub async fn request_code(&self, email: &str) -> String {
        let response = self
            .json(
                "POST",
                "/v1/auth/request-login",
                None,
                serde_json::json!({ "email": email }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let message = self.notifier.last_for(email).expect("login email sent");
        extract_after(&message.text, "Your verification code is: ", 6)
    }

    /// Requests a login and returns the magic-link token from the email
    pub async fn request_link_token(&self, email: &str) -> String {
        self.request_code(email).await;
        let message = self.notifier.last_for(email).expect("login email sent");
        extract_after(&message.text, "/v1/auth/verify?token=", 43)
    }

    /// Logs in through the code flow and returns an access token
    pub async fn login(&self, email: &str) -> String {
        let code = self.request_code(email).await;
        let response = self
            .json(
                "POST",
                "/v1/auth/verify-code",
                None,
                serde_json::json!({ "email": email, "code": code }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["access_token"]
            .as_str()
            .expect("access_token")
            .to_string()
    }
}

fn build(uri: &str, method: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn extract_after(text: &str, marker: &str, len: usize) -> String {
    let start = text.find(marker).expect("marker present") + marker.len();
    text[start..start + len].to_string()
}

pub async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("Location header")
        .to_str()
        .unwrap()
        .to_string()
}
