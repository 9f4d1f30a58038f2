// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the HTTP auth interceptor and the session
//! lifecycle, against a mock backend on an ephemeral port.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use streamhub::auth::jwt::epoch_secs;
use streamhub::auth::SessionState;
use streamhub::config::ClientConfig;
use streamhub::Client;

// -- Mock backend -------------------------------------------------------------

struct Backend {
    /// Token the backend accepts on protected routes and hands out from the
    /// refresh endpoint.
    issued_token: String,
    refresh_ok: bool,
    logout_ok: bool,
    refresh_delay_ms: u64,
    protected_hits: AtomicU32,
    refresh_hits: AtomicU32,
    logout_hits: AtomicU32,
    last_refresh_token: Mutex<Option<String>>,
}

impl Backend {
    fn new(issued_token: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            issued_token: issued_token.into(),
            refresh_ok: true,
            logout_ok: true,
            refresh_delay_ms: 0,
            protected_hits: AtomicU32::new(0),
            refresh_hits: AtomicU32::new(0),
            logout_hits: AtomicU32::new(0),
            last_refresh_token: Mutex::new(None),
        })
    }

    fn failing_refresh(issued_token: impl Into<String>) -> Arc<Self> {
        let mut backend = Self::new(issued_token);
        Arc::get_mut(&mut backend).unwrap().refresh_ok = false;
        backend
    }
}

async fn streams(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    b.protected_hits.fetch_add(1, Ordering::SeqCst);
    let expected = format!("Bearer {}", b.issued_token);
    let authorized =
        headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(expected.as_str());
    if authorized {
        Json(serde_json::json!([{
            "id": "s1",
            "userId": "u1",
            "title": "morning show",
            "description": "",
            "isLive": true,
            "thumbnailUrl": null
        }]))
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": { "code": "UNAUTHORIZED", "message": "invalid token" }
            })),
        )
            .into_response()
    }
}

async fn refresh(
    State(b): State<Arc<Backend>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    b.refresh_hits.fetch_add(1, Ordering::SeqCst);
    *b.last_refresh_token.lock().unwrap() = body
        .get("refreshToken")
        .and_then(|v| v.as_str())
        .map(String::from);
    if b.refresh_delay_ms > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(b.refresh_delay_ms)).await;
    }
    if b.refresh_ok {
        Json(serde_json::json!({ "token": b.issued_token })).into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "refresh unavailable").into_response()
    }
}

async fn logout(State(b): State<Arc<Backend>>) -> Response {
    b.logout_hits.fetch_add(1, Ordering::SeqCst);
    if b.logout_ok {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "logout unavailable").into_response()
    }
}

async fn spawn_backend(backend: Arc<Backend>) -> SocketAddr {
    let router = Router::new()
        .route("/api/streams", get(streams))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
        .with_state(backend);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

// -- Helpers ------------------------------------------------------------------

fn make_token(sub: &str, username: &str, email: &str, exp: u64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::json!({ "sub": sub, "username": username, "email": email, "exp": exp })
            .to_string(),
    );
    format!("{header}.{payload}.unsigned")
}

fn test_config(addr: SocketAddr, state_dir: &std::path::Path) -> ClientConfig {
    ClientConfig {
        api_url: format!("http://{addr}"),
        chat_url: format!("ws://{addr}/ws"),
        reconnect_attempts: 5,
        reconnect_delay_ms: 20,
        reconnect_delay_max_ms: 100,
        http_timeout_secs: 5,
        state_dir: Some(state_dir.to_path_buf()),
    }
}

// -- Interceptor --------------------------------------------------------------

#[tokio::test]
async fn a_401_with_refresh_replays_exactly_once() {
    let backend = Backend::new("new-token");
    let addr = spawn_backend(Arc::clone(&backend)).await;
    let dir = tempfile::tempdir().unwrap();
    let client = Client::new(test_config(addr, dir.path()));

    client.store.set("old-token");
    client.store.set_refresh("rt-1");
    client.api.set_auth("old-token");

    let streams = client.api.streams().await.unwrap();
    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].id, "s1");

    assert_eq!(backend.protected_hits.load(Ordering::SeqCst), 2, "original + one replay");
    assert_eq!(backend.refresh_hits.load(Ordering::SeqCst), 1);
    assert_eq!(
        backend.last_refresh_token.lock().unwrap().as_deref(),
        Some("rt-1")
    );
    // New access token persisted for subsequent requests.
    assert_eq!(client.store.get().as_deref(), Some("new-token"));
}

#[tokio::test]
async fn a_401_with_failed_refresh_surfaces_the_original_401() {
    let backend = Backend::failing_refresh("never-issued");
    let addr = spawn_backend(Arc::clone(&backend)).await;
    let dir = tempfile::tempdir().unwrap();
    let client = Client::new(test_config(addr, dir.path()));

    client.store.set("old-token");
    client.store.set_refresh("rt-1");
    client.api.set_auth("old-token");

    let err = client.api.streams().await.unwrap_err();
    assert!(err.to_string().contains("401"), "got: {err:#}");

    assert_eq!(backend.protected_hits.load(Ordering::SeqCst), 1, "no retry loop");
    assert_eq!(backend.refresh_hits.load(Ordering::SeqCst), 1, "exactly one refresh attempt");
}

#[tokio::test]
async fn a_401_without_refresh_token_is_not_retried() {
    let backend = Backend::new("new-token");
    let addr = spawn_backend(Arc::clone(&backend)).await;
    let dir = tempfile::tempdir().unwrap();
    let client = Client::new(test_config(addr, dir.path()));

    client.api.set_auth("old-token");

    let err = client.api.streams().await.unwrap_err();
    assert!(err.to_string().contains("401"), "got: {err:#}");
    assert_eq!(backend.protected_hits.load(Ordering::SeqCst), 1);
    assert_eq!(backend.refresh_hits.load(Ordering::SeqCst), 0);
}

// -- Session lifecycle --------------------------------------------------------

#[tokio::test]
async fn init_with_valid_token_decodes_identity() {
    let dir = tempfile::tempdir().unwrap();
    let exp = epoch_secs() + 3600;
    let token = make_token("u-1", "alice", "alice@example.com", exp);

    let config = ClientConfig {
        state_dir: Some(dir.path().to_path_buf()),
        ..ClientConfig::default()
    };
    let client = Client::new(config);
    client.store.set(&token);
    client.session.init();

    assert_eq!(client.session.state(), SessionState::Authenticated);
    let identity = client.session.current_user().unwrap();
    assert_eq!(identity.id, "u-1");
    assert_eq!(identity.username, "alice");
    assert_eq!(identity.email, "alice@example.com");
    assert_eq!(identity.expires_at, exp);
}

#[tokio::test]
async fn init_with_expired_token_clears_storage() {
    let dir = tempfile::tempdir().unwrap();
    let token = make_token("u-1", "alice", "a@b.c", epoch_secs() - 60);

    let config = ClientConfig {
        state_dir: Some(dir.path().to_path_buf()),
        ..ClientConfig::default()
    };
    let client = Client::new(config);
    client.store.set(&token);
    client.store.set_refresh("rt-1");
    client.session.init();

    assert_eq!(client.session.state(), SessionState::Anonymous);
    assert!(client.session.current_user().is_none());
    assert_eq!(client.store.get(), None);
    assert_eq!(client.store.get_refresh(), None);
}

#[tokio::test]
async fn login_attaches_header_for_later_requests() {
    let token = make_token("u-1", "alice", "a@b.c", epoch_secs() + 3600);
    let backend = Backend::new(token.clone());
    let addr = spawn_backend(Arc::clone(&backend)).await;
    let dir = tempfile::tempdir().unwrap();
    let client = Client::new(test_config(addr, dir.path()));
    client.session.init();

    client.session.login(&token, Some("rt-1")).unwrap();
    let streams = client.api.streams().await.unwrap();
    assert_eq!(streams.len(), 1);
    assert_eq!(backend.protected_hits.load(Ordering::SeqCst), 1, "no 401, no retry");
}

#[tokio::test]
async fn login_with_undecodable_token_reverts_to_anonymous() {
    let dir = tempfile::tempdir().unwrap();
    let config = ClientConfig {
        state_dir: Some(dir.path().to_path_buf()),
        ..ClientConfig::default()
    };
    let client = Client::new(config);
    client.session.init();

    assert!(client.session.login("not-a-jwt", None).is_err());
    assert_eq!(client.session.state(), SessionState::Anonymous);
    assert!(client.session.current_user().is_none());
    assert_eq!(client.store.get(), None);
}

#[tokio::test]
async fn concurrent_refreshes_are_single_flight() {
    let token = make_token("u-1", "alice", "a@b.c", epoch_secs() + 3600);
    let mut backend = Backend::new(token.clone());
    Arc::get_mut(&mut backend).unwrap().refresh_delay_ms = 100;
    let addr = spawn_backend(Arc::clone(&backend)).await;
    let dir = tempfile::tempdir().unwrap();
    let client = Client::new(test_config(addr, dir.path()));
    client.store.set_refresh("rt-1");

    let (first, second) = tokio::join!(client.session.refresh(), client.session.refresh());
    assert!(first.is_ok());
    assert!(second.is_ok());

    assert_eq!(backend.refresh_hits.load(Ordering::SeqCst), 1, "second call is a no-op");
    assert_eq!(client.session.state(), SessionState::Authenticated);
    assert_eq!(client.store.get().as_deref(), Some(token.as_str()));
}

#[tokio::test]
async fn failed_refresh_logs_out() {
    let backend = Backend::failing_refresh("never-issued");
    let addr = spawn_backend(Arc::clone(&backend)).await;
    let dir = tempfile::tempdir().unwrap();
    let client = Client::new(test_config(addr, dir.path()));

    let token = make_token("u-1", "alice", "a@b.c", epoch_secs() + 3600);
    client.store.set(&token);
    client.store.set_refresh("rt-1");
    client.session.init();
    assert_eq!(client.session.state(), SessionState::Authenticated);

    assert!(client.session.refresh().await.is_err());
    assert_eq!(client.session.state(), SessionState::Anonymous);
    assert!(client.session.current_user().is_none());
    assert_eq!(client.store.get(), None);
    assert_eq!(client.store.get_refresh(), None);
    assert_eq!(backend.logout_hits.load(Ordering::SeqCst), 1, "server logout attempted");
}

#[tokio::test]
async fn logout_is_best_effort_when_the_server_fails() {
    let mut backend = Backend::new("whatever");
    Arc::get_mut(&mut backend).unwrap().logout_ok = false;
    let addr = spawn_backend(Arc::clone(&backend)).await;
    let dir = tempfile::tempdir().unwrap();
    let client = Client::new(test_config(addr, dir.path()));

    let token = make_token("u-1", "alice", "a@b.c", epoch_secs() + 3600);
    client.store.set(&token);
    client.store.set_refresh("rt-1");
    client.session.init();

    client.session.logout().await;
    assert_eq!(backend.logout_hits.load(Ordering::SeqCst), 1);
    assert_eq!(client.session.state(), SessionState::Anonymous);
    assert_eq!(client.store.get(), None);
    assert_eq!(client.store.get_refresh(), None);
}
