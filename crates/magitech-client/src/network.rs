use std::collections::HashMap;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ClientError;
use crate::types::{
    ActionResult, AuthData, Character, ChatMessage, CombatView, Deleted, Enemy, GameSession,
    LeaveResult, PlayerAction, Position, SessionDetail, SessionPlayer, SyncSnapshot, User,
};

/// Consecutive failures before [`NetworkManager::connection_issues`] trips.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Typed client for the session server.
///
/// Holds the bearer token after login, the last activity sequence seen per
/// session, and a counter of consecutive connection failures.
#[derive(Debug)]
pub struct NetworkManager {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    user: Option<User>,
    last_sequence: HashMap<i32, i64>,
    failures: u32,
    failure_threshold: u32,
}

impl NetworkManager {
    /// Client for the server at `base_url` (e.g. `http://127.0.0.1:5000`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        NetworkManager {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            user: None,
            last_sequence: HashMap::new(),
            failures: 0,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn failure_count(&self) -> u32 {
        self.failures
    }

    /// True once consecutive failures reach the threshold.
    pub fn connection_issues(&self) -> bool {
        self.failures >= self.failure_threshold
    }

    /// Highest activity sequence already delivered for `session_id`.
    pub fn last_sequence(&self, session_id: i32) -> i64 {
        self.last_sequence.get(&session_id).copied().unwrap_or(0)
    }

    /// Forget sync progress so the next sync replays the whole log.
    pub fn reset_sync(&mut self, session_id: i32) {
        self.last_sequence.remove(&session_id);
    }

    pub fn logout(&mut self) {
        self.token = None;
        self.user = None;
        self.last_sequence.clear();
    }

    // ── Transport ──

    async fn request<T: DeserializeOwned>(
        &mut self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http.request(method.clone(), &url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        tracing::debug!("{} {}", method, path);
        let result = self.read_envelope(builder).await;
        match &result {
            Err(e) if e.is_connection_failure() => {
                self.failures = self.failures.saturating_add(1);
                tracing::warn!(
                    failures = self.failures,
                    "{} {} failed: {}",
                    method,
                    path,
                    e
                );
            }
            _ => self.failures = 0,
        }
        result
    }

    async fn read_envelope<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        let envelope: Envelope<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if status >= 400 => {
                return Err(ClientError::Api {
                    status,
                    code: "HTTP_ERROR".to_string(),
                    message: text,
                });
            }
            Err(e) => return Err(ClientError::Decode(e.to_string())),
        };

        if status >= 400 || !envelope.success {
            let (code, message) = envelope
                .error
                .map(|e| (e.code, e.message))
                .unwrap_or_else(|| ("UNKNOWN".to_string(), String::new()));
            return Err(ClientError::Api {
                status,
                code,
                message,
            });
        }

        envelope
            .data
            .ok_or_else(|| ClientError::Decode("response has no data".to_string()))
    }

    async fn get<T: DeserializeOwned>(&mut self, path: &str) -> Result<T, ClientError> {
        self.request(Method::GET, path, &[], None).await
    }

    async fn post<T: DeserializeOwned>(&mut self, path: &str, body: Value) -> Result<T, ClientError> {
        self.request(Method::POST, path, &[], Some(body)).await
    }

    fn require_auth(&self) -> Result<(), ClientError> {
        if self.token.is_none() {
            return Err(ClientError::NotAuthenticated);
        }
        Ok(())
    }

    // ── Auth ──

    pub async fn register(&mut self, username: &str, password: &str) -> Result<User, ClientError> {
        let auth: AuthData = self
            .post(
                "/api/auth/register",
                json!({ "username": username, "password": password }),
            )
            .await?;
        Ok(self.store_auth(auth))
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<User, ClientError> {
        let auth: AuthData = self
            .post(
                "/api/auth/login",
                json!({ "username": username, "password": password }),
            )
            .await?;
        Ok(self.store_auth(auth))
    }

    fn store_auth(&mut self, auth: AuthData) -> User {
        tracing::info!(user_id = auth.user.id, "logged in as {}", auth.user.username);
        self.token = Some(auth.access_token);
        self.user = Some(auth.user.clone());
        auth.user
    }

    pub async fn me(&mut self) -> Result<User, ClientError> {
        self.require_auth()?;
        self.get("/api/auth/me").await
    }

    // ── Characters ──

    pub async fn list_characters(&mut self) -> Result<Vec<Character>, ClientError> {
        self.require_auth()?;
        self.get("/api/characters").await
    }

    pub async fn create_character(&mut self, name: &str, data: Value) -> Result<Character, ClientError> {
        self.require_auth()?;
        self.post("/api/characters", json!({ "name": name, "data": data }))
            .await
    }

    pub async fn get_character(&mut self, id: i32) -> Result<Character, ClientError> {
        self.require_auth()?;
        self.get(&format!("/api/characters/{id}")).await
    }

    pub async fn save_character(
        &mut self,
        id: i32,
        name: &str,
        data: Value,
    ) -> Result<Character, ClientError> {
        self.require_auth()?;
        self.request(
            Method::PUT,
            &format!("/api/characters/{id}"),
            &[],
            Some(json!({ "name": name, "data": data })),
        )
        .await
    }

    pub async fn delete_character(&mut self, id: i32) -> Result<Deleted, ClientError> {
        self.require_auth()?;
        self.request(Method::DELETE, &format!("/api/characters/{id}"), &[], None)
            .await
    }

    // ── Sessions ──

    pub async fn list_sessions(&mut self) -> Result<Vec<GameSession>, ClientError> {
        self.require_auth()?;
        self.get("/api/sessions").await
    }

    pub async fn create_session(
        &mut self,
        name: &str,
        max_players: Option<i32>,
        character_id: Option<i32>,
    ) -> Result<SessionDetail, ClientError> {
        self.require_auth()?;
        let detail: SessionDetail = self
            .post(
                "/api/sessions",
                json!({
                    "name": name,
                    "max_players": max_players,
                    "character_id": character_id,
                }),
            )
            .await?;
        self.last_sequence.insert(detail.session.id, 0);
        Ok(detail)
    }

    pub async fn get_session(&mut self, id: i32) -> Result<SessionDetail, ClientError> {
        self.require_auth()?;
        self.get(&format!("/api/sessions/{id}")).await
    }

    pub async fn join_session(
        &mut self,
        id: i32,
        character_id: Option<i32>,
    ) -> Result<SessionDetail, ClientError> {
        self.require_auth()?;
        let detail = self
            .post(
                &format!("/api/sessions/{id}/join"),
                json!({ "character_id": character_id }),
            )
            .await?;
        self.last_sequence.entry(id).or_insert(0);
        Ok(detail)
    }

    pub async fn leave_session(&mut self, id: i32) -> Result<LeaveResult, ClientError> {
        self.require_auth()?;
        let result = self
            .post(&format!("/api/sessions/{id}/leave"), json!({}))
            .await?;
        self.last_sequence.remove(&id);
        Ok(result)
    }

    pub async fn update_position(
        &mut self,
        id: i32,
        position: &Position,
    ) -> Result<SessionPlayer, ClientError> {
        self.require_auth()?;
        let body = serde_json::to_value(position).map_err(|e| ClientError::Decode(e.to_string()))?;
        self.post(&format!("/api/sessions/{id}/position"), body)
            .await
    }

    /// Fetch activities newer than the last one seen and advance the cursor.
    pub async fn sync(&mut self, id: i32) -> Result<SyncSnapshot, ClientError> {
        self.require_auth()?;
        let since = self.last_sequence(id);
        let snapshot: SyncSnapshot = self
            .request(
                Method::GET,
                &format!("/api/sessions/{id}/sync"),
                &[("since", since.to_string())],
                None,
            )
            .await?;
        if let Some(last) = snapshot.activities.last() {
            self.last_sequence.insert(id, last.sequence.max(since));
        }
        Ok(snapshot)
    }

    /// Sync repeatedly until the server reports nothing more to deliver.
    pub async fn catch_up(&mut self, id: i32) -> Result<SyncSnapshot, ClientError> {
        let mut snapshot = self.sync(id).await?;
        let mut activities = std::mem::take(&mut snapshot.activities);
        while snapshot.has_more {
            snapshot = self.sync(id).await?;
            activities.append(&mut snapshot.activities);
        }
        snapshot.activities = activities;
        Ok(snapshot)
    }

    // ── Combat ──

    pub async fn combat(&mut self, id: i32) -> Result<CombatView, ClientError> {
        self.require_auth()?;
        self.get(&format!("/api/sessions/{id}/combat")).await
    }

    pub async fn start_combat(
        &mut self,
        id: i32,
        enemy: &Enemy,
        participants: Option<&[i32]>,
    ) -> Result<CombatView, ClientError> {
        self.require_auth()?;
        self.post(
            &format!("/api/sessions/{id}/combat/start"),
            json!({ "enemy": enemy, "participants": participants }),
        )
        .await
    }

    pub async fn combat_action(
        &mut self,
        id: i32,
        action: &PlayerAction,
    ) -> Result<ActionResult, ClientError> {
        self.require_auth()?;
        let body = serde_json::to_value(action).map_err(|e| ClientError::Decode(e.to_string()))?;
        self.post(&format!("/api/sessions/{id}/combat/action"), body)
            .await
    }

    pub async fn end_combat(&mut self, id: i32) -> Result<CombatView, ClientError> {
        self.require_auth()?;
        self.post(&format!("/api/sessions/{id}/combat/end"), json!({}))
            .await
    }

    // ── Chat ──

    pub async fn chat_history(&mut self, id: i32) -> Result<Vec<ChatMessage>, ClientError> {
        self.require_auth()?;
        self.get(&format!("/api/sessions/{id}/chat")).await
    }

    pub async fn send_chat(&mut self, id: i32, message: &str) -> Result<ChatMessage, ClientError> {
        self.require_auth()?;
        self.post(
            &format!("/api/sessions/{id}/chat"),
            json!({ "message": message }),
        )
        .await
    }
}
