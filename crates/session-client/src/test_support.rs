//! Mock API + authorization server for tests
//!
//! Routes:
//! - `POST /auth/login`: `ada` / `hunter2` succeeds with a nested body, anything else 401
//! - `POST /auth/refresh`: counts calls, sleeps `refresh_delay`, then issues or rejects
//! - `POST /auth/logout`: counts calls, always 500
//! - `/public/*`: 200 regardless of credentials
//! - `/api/status/{code}`: `code` when authorized
//! - `/api/*`: 200 echo when the bearer token is accepted, 401 otherwise

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::{Value, json};
use session_auth::{CredentialPair, CredentialStore, MemoryStorage, StorageKeys, Token};
use tokio::net::TcpListener;

#[derive(Clone)]
pub enum RefreshBehavior {
    Issue {
        access: &'static str,
        refresh: Option<&'static str>,
    },
    Reject,
}

#[derive(Clone)]
pub struct MockConfig {
    /// Bearer tokens `/api/*` accepts
    pub accepted_tokens: Vec<&'static str>,
    pub refresh: RefreshBehavior,
    pub refresh_delay: Duration,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            accepted_tokens: vec!["tok-2"],
            refresh: RefreshBehavior::Issue {
                access: "tok-2",
                refresh: None,
            },
            refresh_delay: Duration::ZERO,
        }
    }
}

struct MockState {
    config: MockConfig,
    refresh_calls: AtomicUsize,
    api_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    seen_authorization: Mutex<Vec<Option<String>>>,
    seen_refresh_tokens: Mutex<Vec<String>>,
}

pub struct MockBackend {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockBackend {
    pub async fn start(config: MockConfig) -> Self {
        let state = Arc::new(MockState {
            config,
            refresh_calls: AtomicUsize::new(0),
            api_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            seen_authorization: Mutex::new(Vec::new()),
            seen_refresh_tokens: Mutex::new(Vec::new()),
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = axum::Router::new()
            .route("/auth/login", post(login_handler))
            .route("/auth/refresh", post(refresh_handler))
            .route("/auth/logout", post(logout_handler))
            .fallback(api_handler)
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn refresh_calls(&self) -> usize {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn api_calls(&self) -> usize {
        self.state.api_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.state.logout_calls.load(Ordering::SeqCst)
    }

    /// `Authorization` header of every `/api` and `/public` call, in arrival order.
    pub fn seen_authorization(&self) -> Vec<Option<String>> {
        self.state.seen_authorization.lock().unwrap().clone()
    }

    pub fn seen_refresh_tokens(&self) -> Vec<String> {
        self.state.seen_refresh_tokens.lock().unwrap().clone()
    }
}

async fn login_handler(Json(body): Json<Value>) -> Response {
    if body["identifier"] == "ada" && body["secret"] == "hunter2" {
        Json(json!({
            "user": {"id": 1, "name": "ada"},
            "data": {"accessToken": "tok-1", "refreshToken": "ref-1"}
        }))
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "bad credentials"})),
        )
            .into_response()
    }
}

async fn refresh_handler(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(refresh) = body["refresh"].as_str() {
        state
            .seen_refresh_tokens
            .lock()
            .unwrap()
            .push(refresh.to_string());
    }
    tokio::time::sleep(state.config.refresh_delay).await;

    match &state.config.refresh {
        RefreshBehavior::Issue { access, refresh } => {
            Json(json!({"access": access, "refresh": refresh})).into_response()
        }
        RefreshBehavior::Reject => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid_grant"})),
        )
            .into_response(),
    }
}

async fn logout_handler(State(state): State<Arc<MockState>>) -> Response {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    (StatusCode::INTERNAL_SERVER_ERROR, "logout backend down").into_response()
}

async fn api_handler(State(state): State<Arc<MockState>>, request: Request<Body>) -> Response {
    state.api_calls.fetch_add(1, Ordering::SeqCst);

    let auth = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.seen_authorization.lock().unwrap().push(auth.clone());

    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let body_bytes = axum::body::to_bytes(request.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let body = String::from_utf8_lossy(&body_bytes).to_string();

    if path.starts_with("/public/") {
        return Json(json!({"ok": true, "path": path})).into_response();
    }

    let token = auth
        .as_deref()
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| state.config.accepted_tokens.iter().any(|accepted| accepted == t));

    let Some(token) = token else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "token expired", "seen": auth})),
        )
            .into_response();
    };

    if let Some(code) = path.strip_prefix("/api/status/") {
        let status = code
            .parse::<u16>()
            .ok()
            .and_then(|c| StatusCode::from_u16(c).ok())
            .unwrap_or(StatusCode::BAD_REQUEST);
        return (status, Json(json!({"status": status.as_u16()}))).into_response();
    }

    Json(json!({
        "ok": true,
        "token": token,
        "method": method,
        "path": path,
        "body": body,
    }))
    .into_response()
}

/// URL of a port with nothing listening on it.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn memory_store() -> Arc<CredentialStore> {
    Arc::new(CredentialStore::new(
        Arc::new(MemoryStorage::new()),
        StorageKeys::default(),
    ))
}

pub async fn seed(store: &CredentialStore, access: &str, refresh: Option<&str>) {
    store
        .store_pair(&CredentialPair {
            access: Token::new(access),
            refresh: refresh.map(Token::new),
        })
        .await
        .unwrap();
}
