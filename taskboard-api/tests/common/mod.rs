//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - App wired to an in-memory store
//! - A fake identity provider
//! - Session token generation
//! - Request and response helpers

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::Config;
use taskboard_api::identity::{IdentityError, IdentityProvider, IdentityProviders};
use taskboard_shared::auth::session::{issue_session_token, SessionUser};
use taskboard_shared::store::memory::MemoryStore;
use taskboard_shared::store::DocumentStore;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

/// Provider that signs in whoever the code names
///
/// The codes `ana` and `bob` map to the test users; anything else is
/// rejected.
pub struct FakeProvider;

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn id(&self) -> &'static str {
        "fake"
    }

    fn authorization_url(&self, state: &str, redirect_uri: &str) -> Result<String, IdentityError> {
        Ok(format!(
            "https://id.example/authorize?state={}&redirect_uri={}",
            state, redirect_uri
        ))
    }

    async fn exchange_code(&self, code: &str, _redirect_uri: &str) -> Result<SessionUser, IdentityError> {
        match code {
            "ana" => Ok(ana()),
            "bob" => Ok(bob()),
            _ => Err(IdentityError::Denied("unknown code".to_string())),
        }
    }
}

pub fn ana() -> SessionUser {
    SessionUser::new("ana@example.com", "Ana")
}

pub fn bob() -> SessionUser {
    SessionUser::new("bob@example.com", "Bob")
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<dyn DocumentStore>,
    pub app: axum::Router,
    pub config: Config,
}

impl TestContext {
    /// Fresh in-memory app with default settings
    pub fn new() -> Self {
        Self::with_vars(&[])
    }

    /// Fresh in-memory app with extra configuration variables
    pub fn with_vars(extra: &[(&str, &str)]) -> Self {
        let mut vars: HashMap<String, String> = HashMap::from([
            ("JWT_SECRET".to_string(), TEST_SECRET.to_string()),
            ("STORE_BACKEND".to_string(), "memory".to_string()),
            ("PUBLIC_URL".to_string(), "http://taskboard.test".to_string()),
        ]);
        for (key, value) in extra {
            vars.insert(key.to_string(), value.to_string());
        }
        let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("test config");

        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let providers = IdentityProviders::new().with(Arc::new(FakeProvider));
        let app = build_router(AppState::new(Arc::clone(&store), config.clone(), providers));

        TestContext { store, app, config }
    }

    /// Bearer header value for a user
    pub fn auth_header(&self, user: &SessionUser) -> String {
        format!("Bearer {}", issue_session_token(user, &self.config.jwt.secret).unwrap())
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, user: Option<&SessionUser>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, self.auth_header(user));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, body: Value, user: Option<&SessionUser>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, self.auth_header(user));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    pub async fn delete(&self, uri: &str, user: Option<&SessionUser>) -> Response<Body> {
        let mut builder = Request::builder().method("DELETE").uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, self.auth_header(user));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Creates a task through the API and returns its id
    pub async fn create_task(&self, user: &SessionUser, content: &str, public: bool) -> String {
        let response = self
            .post_json(
                "/dashboard/tasks",
                serde_json::json!({ "content": content, "public": public }),
                Some(user),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        body["task"]["id"].as_str().unwrap().to_string()
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// `name=value` pairs from all `Set-Cookie` headers
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(String::from)
        .collect()
}
