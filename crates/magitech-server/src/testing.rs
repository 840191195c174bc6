use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderMap;
use sea_orm::DatabaseConnection;
use serde_json::json;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::game::GameState;

/// A test application for integration testing.
///
/// Spins up a server on an ephemeral port with an in-memory SQLite database.
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_register() {
///     let app = TestApp::new().await;
///     let (token, user) = app.register_user("alice", "secret123").await;
///     let res = app.client.get_with_auth(&app.url("/api/auth/me"), &token).await;
///     assert_eq!(res.status, 200);
/// }
/// ```
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: TestClient,
    pub db: DatabaseConnection,
    pub config: Config,
    pub game: Arc<GameState>,
}

impl TestApp {
    /// Create a test app with [`Config::for_tests`].
    pub async fn new() -> Self {
        Self::with_config(Config::for_tests()).await
    }

    /// Create a test app with a custom config.
    pub async fn with_config(config: Config) -> Self {
        let app = crate::App::with_config(config)
            .await
            .expect("Failed to create test app");

        let router = app.router();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        TestApp {
            addr,
            client: TestClient::new(addr),
            db: app.db,
            config: app.config,
            game: app.game,
        }
    }

    /// Get the URL for a path on the test server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Register a user and return `(token, user)`.
    pub async fn register_user(&self, username: &str, password: &str) -> (String, serde_json::Value) {
        let body = json!({ "username": username, "password": password });
        let res = self
            .client
            .post(&self.url("/api/auth/register"), &body.to_string())
            .await;

        assert_eq!(res.status, 200, "Register failed: {}", res.body);

        let data = res.data();
        let token = data["access_token"].as_str().unwrap().to_string();
        (token, data["user"].clone())
    }

    /// Login and return the auth token.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let body = json!({ "username": username, "password": password });
        let res = self
            .client
            .post(&self.url("/api/auth/login"), &body.to_string())
            .await;

        assert_eq!(res.status, 200, "Login failed: {}", res.body);
        res.data()["access_token"].as_str().unwrap().to_string()
    }

    /// Create a session hosted by `token`'s user and return its id.
    pub async fn create_session(&self, token: &str, name: &str) -> i64 {
        let body = json!({ "name": name });
        let res = self
            .client
            .post_with_auth(&self.url("/api/sessions"), token, &body.to_string())
            .await;

        assert_eq!(res.status, 200, "Create session failed: {}", res.body);
        res.data()["session"]["id"].as_i64().unwrap()
    }

    /// Join session `id` as `token`'s user.
    pub async fn join_session(&self, token: &str, id: i64) -> TestResponse {
        self.client
            .post_with_auth(&self.url(&format!("/api/sessions/{id}/join")), token, "{}")
            .await
    }
}

/// A simple HTTP test client with helper methods.
#[derive(Clone)]
pub struct TestClient {
    inner: reqwest::Client,
    base_addr: SocketAddr,
}

impl TestClient {
    /// Create a new test client pointing at the given address.
    pub fn new(addr: SocketAddr) -> Self {
        TestClient {
            inner: reqwest::Client::new(),
            base_addr: addr,
        }
    }

    /// Send a GET request.
    pub async fn get(&self, url: &str) -> TestResponse {
        let res = self
            .inner
            .get(url)
            .send()
            .await
            .expect("GET request failed");
        TestResponse::from_response(res).await
    }

    /// Send a GET request with an auth token.
    pub async fn get_with_auth(&self, url: &str, token: &str) -> TestResponse {
        let res = self
            .inner
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .expect("GET request failed");
        TestResponse::from_response(res).await
    }

    /// Send a POST request with a JSON body.
    pub async fn post(&self, url: &str, body: &str) -> TestResponse {
        let res = self
            .inner
            .post(url)
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect("POST request failed");
        TestResponse::from_response(res).await
    }

    /// Send a POST request with auth token and JSON body.
    pub async fn post_with_auth(&self, url: &str, token: &str, body: &str) -> TestResponse {
        let res = self
            .inner
            .post(url)
            .header("Content-Type", "application/json")
            .bearer_auth(token)
            .body(body.to_string())
            .send()
            .await
            .expect("POST request failed");
        TestResponse::from_response(res).await
    }

    /// Send a PUT request with auth token and JSON body.
    pub async fn put_with_auth(&self, url: &str, token: &str, body: &str) -> TestResponse {
        let res = self
            .inner
            .put(url)
            .header("Content-Type", "application/json")
            .bearer_auth(token)
            .body(body.to_string())
            .send()
            .await
            .expect("PUT request failed");
        TestResponse::from_response(res).await
    }

    /// Send a DELETE request with auth token.
    pub async fn delete_with_auth(&self, url: &str, token: &str) -> TestResponse {
        let res = self
            .inner
            .delete(url)
            .bearer_auth(token)
            .send()
            .await
            .expect("DELETE request failed");
        TestResponse::from_response(res).await
    }

    /// Get the base URL.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.base_addr)
    }
}

/// A simplified HTTP response for test assertions.
#[derive(Debug)]
pub struct TestResponse {
    pub status: u16,
    pub body: String,
    pub headers: HeaderMap,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let body = res.text().await.unwrap_or_default();
        TestResponse {
            status,
            body,
            headers,
        }
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("Failed to parse response as JSON")
    }

    /// Check if the response indicates success.
    pub fn is_success(&self) -> bool {
        self.json()["success"].as_bool().unwrap_or(false)
    }

    /// Get the data field from the response.
    pub fn data(&self) -> serde_json::Value {
        self.json()["data"].clone()
    }

    /// Get the error field from the response.
    pub fn error(&self) -> serde_json::Value {
        self.json()["error"].clone()
    }
}
