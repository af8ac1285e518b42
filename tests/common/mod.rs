use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use mytasks_api_rust::config::{
    ApiConfig, AppConfig, Environment, IdStrategyKind, SecurityConfig, StorageConfig,
};
use mytasks_api_rust::server;
use mytasks_api_rust::state::{strategy, AppState};
use mytasks_api_rust::store::MemoryStore;

pub const BASE_URL: &str = "http://testserver";

/// In-process app over a memory store; every oneshot call drives the full
/// router, middleware included.
pub struct TestApp {
    router: Router,
}

fn test_config(id_strategy: IdStrategyKind) -> AppConfig {
    AppConfig {
        environment: Environment::Development,
        storage: StorageConfig { data_dir: "unused".into(), id_strategy },
        api: ApiConfig { port: 0, base_url: BASE_URL.into() },
        security: SecurityConfig { jwt_secret: "test_secret".into(), jwt_expiry_hours: 1 },
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_strategy(IdStrategyKind::Sequential)
    }

    pub fn with_strategy(kind: IdStrategyKind) -> Self {
        let config = test_config(kind);
        let state = AppState::new(Arc::new(MemoryStore::new()), strategy(kind), &config);
        Self { router: server::app(state) }
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn register(&self, name: &str, password: &str) -> Value {
        let (status, body) = self
            .request(
                "POST",
                "/auth/register",
                None,
                Some(json!({ "name": name, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {}", body);
        body
    }

    pub async fn login(&self, name: &str, password: &str) -> String {
        let (status, body) = self
            .request(
                "POST",
                "/auth/login",
                None,
                Some(json!({ "name": name, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().expect("token in login response").to_string()
    }

    /// Register + login in one go, returning (user id, token).
    pub async fn signup(&self, name: &str) -> (String, String) {
        let user = self.register(name, "hunter2").await;
        let token = self.login(name, "hunter2").await;
        (user["id"].as_str().unwrap().to_string(), token)
    }
}
