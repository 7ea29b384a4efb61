/// Common test utilities for integration tests
///
/// Every `TestContext` owns a fresh in-memory SQLite database with the
/// migrations applied and a router built on top of it. Helpers drive the
/// router in-process with `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use serde_json::Value;
use sqlx::SqlitePool;
use taskdesk_api::app::{build_router, AppState};
use taskdesk_api::config::Config;
use taskdesk_shared::db::migrations::run_migrations;
use taskdesk_shared::db::pool::{create_pool, DatabaseConfig};
use tower::ServiceExt;

/// Shared password for every test account
pub const PASSWORD: &str = "pw";

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: SqlitePool,
    pub app: axum::Router,
}

/// Response pieces the tests look at
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestContext {
    /// Creates a new test context with a fresh database
    pub async fn new() -> anyhow::Result<Self> {
        let db = create_pool(DatabaseConfig::in_memory()).await?;
        run_migrations(&db).await?;

        let app = build_router(AppState::new(db.clone(), Config::default()));

        Ok(TestContext { db, app })
    }

    /// Sends one request through the router
    ///
    /// `cookie` is the `name=value` pair returned by [`TestContext::login`].
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Registers an account and returns its id
    pub async fn register(&self, username: &str, role: &str) -> i64 {
        let response = self
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(serde_json::json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": PASSWORD,
                    "role": role,
                })),
            )
            .await;

        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "register {} failed: {}",
            username,
            response.body
        );
        response.body["id"].as_i64().unwrap()
    }

    /// Logs in and returns the `taskdesk_session=...` cookie pair
    pub async fn login(&self, username: &str) -> String {
        let response = self
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(serde_json::json!({ "username": username, "password": PASSWORD })),
            )
            .await;

        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);
        session_cookie(&response.headers).expect("login must set the session cookie")
    }

    /// Registers and logs in, returning (user id, cookie)
    pub async fn user(&self, username: &str, role: &str) -> (i64, String) {
        let id = self.register(username, role).await;
        let cookie = self.login(username).await;
        (id, cookie)
    }
}

/// Extracts the `name=value` part of the session `Set-Cookie` header
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("taskdesk_session="))
        .and_then(|v| v.split(';').next())
        .map(|pair| pair.to_string())
}
