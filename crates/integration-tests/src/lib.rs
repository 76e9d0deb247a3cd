//! Integration test harness for Rabit.
//!
//! Each test spawns the full application on an ephemeral port, backed by the
//! in-memory store and in-memory sessions, with the Claude API replaced by a
//! local mock server. Tests talk to it over HTTP with a cookie-holding
//! `reqwest` client, exactly like a browser would.
//!
//! ```bash
//! cargo test -p rabit-integration-tests
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use reqwest::Client;
use secrecy::SecretString;
use serde_json::{Value, json};

use rabit_core::models::User;
use rabit_core::UserRole;
use rabit_server::claude::ClaudeClient;
use rabit_server::config::{AppConfig, ClaudeConfig, StoreBackend};
use rabit_server::middleware::{create_session_layer, memory_session_store};
use rabit_server::services::AuthService;
use rabit_server::state::AppState;
use rabit_server::store::Store;

/// Password given to every test user.
pub const PASSWORD: &str = "correct-horse-battery";

/// How the mock Claude API answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaudeReply {
    /// A forced `suggest_shipping_companies` tool call.
    Suggest,
    /// HTTP 500 with an API error body.
    Fail,
}

#[derive(Clone)]
struct MockClaude {
    reply: ClaudeReply,
    calls: Arc<AtomicUsize>,
}

async fn mock_messages(
    State(mock): State<MockClaude>,
    Json(_request): Json<Value>,
) -> (StatusCode, Json<Value>) {
    mock.calls.fetch_add(1, Ordering::SeqCst);
    match mock.reply {
        ClaudeReply::Suggest => (
            StatusCode::OK,
            Json(json!({
                "id": "msg_test",
                "model": "claude-test",
                "stop_reason": "tool_use",
                "content": [{
                    "type": "tool_use",
                    "id": "toolu_1",
                    "name": "suggest_shipping_companies",
                    "input": {
                        "suggested_companies": ["Aramex", "DHL"],
                        "reasoning": "Both deliver to the destination within two days."
                    }
                }],
                "usage": {"input_tokens": 42, "output_tokens": 17}
            })),
        ),
        ClaudeReply::Fail => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "type": "error",
                "error": {"type": "api_error", "message": "overloaded"}
            })),
        ),
    }
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    addr
}

fn config(claude_url: String) -> AppConfig {
    AppConfig {
        store: StoreBackend::Memory,
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: "http://localhost".to_string(),
        claude: ClaudeConfig {
            api_key: SecretString::from("sk-ant-test-key"),
            model: "claude-test".to_string(),
            api_url: claude_url,
        },
        workspace_idle: Duration::from_secs(60),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
        tls: None,
    }
}

/// A running application plus handles into its internals.
pub struct TestApp {
    pub base_url: String,
    pub store: Store,
    pub state: AppState,
    claude_calls: Arc<AtomicUsize>,
}

impl TestApp {
    /// Spawn the app with a mock Claude API that suggests carriers.
    pub async fn spawn() -> Self {
        Self::spawn_with(ClaudeReply::Suggest).await
    }

    /// Spawn the app with the given mock Claude behaviour.
    pub async fn spawn_with(reply: ClaudeReply) -> Self {
        let calls = Arc::new(AtomicUsize::new(0));
        let mock = Router::new()
            .route("/v1/messages", post(mock_messages))
            .with_state(MockClaude {
                reply,
                calls: Arc::clone(&calls),
            });
        let claude_addr = serve(mock).await;

        let config = config(format!("http://{claude_addr}"));
        let claude = ClaudeClient::new(&config.claude).expect("claude client");
        let store = Store::memory();
        let session_layer = create_session_layer(memory_session_store(), &config);
        let state = AppState::new(config, store.clone(), claude);
        let addr = serve(rabit_server::app(state.clone(), session_layer)).await;

        Self {
            base_url: format!("http://{addr}"),
            store,
            state,
            claude_calls: calls,
        }
    }

    /// Requests received by the mock Claude API so far.
    #[must_use]
    pub fn claude_calls(&self) -> usize {
        self.claude_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A client that keeps the session cookie.
    #[must_use]
    pub fn client() -> Client {
        Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client")
    }

    /// Register a user with [`PASSWORD`].
    pub async fn create_user(&self, email: &str, role: UserRole) -> User {
        AuthService::new(&self.store)
            .register_with_password(email, "Test User", role, PASSWORD)
            .await
            .expect("register user")
    }

    /// A logged-in client for a fresh user.
    pub async fn login_as(&self, email: &str, role: UserRole) -> (Client, User) {
        let user = self.create_user(email, role).await;
        let client = Self::client();
        let resp = client
            .post(self.url("/auth/login"))
            .json(&json!({"email": email, "password": PASSWORD}))
            .send()
            .await
            .expect("login request");
        assert_eq!(resp.status(), reqwest::StatusCode::OK, "login failed");
        (client, user)
    }

    /// A logged-in owner with a brand; returns the brand id.
    pub async fn owner_with_brand(&self, email: &str) -> (Client, i32) {
        let (client, _) = self.login_as(email, UserRole::Owner).await;
        let resp = client
            .post(self.url("/api/brands"))
            .json(&json!({"name": "Acme Goods", "phone": "0123456789"}))
            .send()
            .await
            .expect("create brand");
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
        let brand: Value = resp.json().await.expect("brand json");
        let id = brand["id"].as_i64().expect("brand id");
        (client, i32::try_from(id).expect("brand id fits"))
    }
}

/// POST JSON and return status plus body.
pub async fn post_json(client: &Client, url: &str, body: &Value) -> (reqwest::StatusCode, Value) {
    let resp = client.post(url).json(body).send().await.expect("request");
    let status = resp.status();
    (status, resp.json().await.unwrap_or(Value::Null))
}

/// GET and return status plus body.
pub async fn get_json(client: &Client, url: &str) -> (reqwest::StatusCode, Value) {
    let resp = client.get(url).send().await.expect("request");
    let status = resp.status();
    (status, resp.json().await.unwrap_or(Value::Null))
}

/// One Server-Sent Event.
#[derive(Debug, Clone)]
pub struct SseEvent {
    pub name: String,
    pub data: Value,
}

/// Reads named events off an open `text/event-stream` response.
pub struct EventReader {
    response: reqwest::Response,
    buffer: String,
}

impl EventReader {
    /// Open the stream at `url` with `client`'s session.
    pub async fn open(client: &Client, url: &str) -> Self {
        let response = client.get(url).send().await.expect("open event stream");
        assert_eq!(response.status(), reqwest::StatusCode::OK, "event stream refused");
        Self {
            response,
            buffer: String::new(),
        }
    }

    /// The next named event, or `None` if the stream ended or stayed quiet
    /// for `wait`. Keep-alive comments are skipped.
    pub async fn next_within(&mut self, wait: Duration) -> Option<SseEvent> {
        tokio::time::timeout(wait, self.next_event())
            .await
            .ok()
            .flatten()
    }

    async fn next_event(&mut self) -> Option<SseEvent> {
        loop {
            while let Some(end) = self.buffer.find("\n\n") {
                let frame: String = self.buffer.drain(..end + 2).collect();
                if let Some(event) = parse_frame(&frame) {
                    return Some(event);
                }
            }
            let chunk = self.response.chunk().await.ok()??;
            self.buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
    }
}

fn parse_frame(frame: &str) -> Option<SseEvent> {
    let mut name = None;
    let mut data = String::new();
    for line in frame.lines() {
        if let Some(value) = line.strip_prefix("event:") {
            name = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("data:") {
            data.push_str(value.strip_prefix(' ').unwrap_or(value));
        }
    }
    Some(SseEvent {
        name: name?,
        data: serde_json::from_str(&data).unwrap_or(Value::Null),
    })
}
