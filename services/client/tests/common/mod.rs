//! Shared helpers for the client integration tests.

#![allow(dead_code)]

use client_lib::adapters::MemoryTokenStorage;
use client_lib::app::AppState;
use client_lib::config::{parse_base_url, Config};
use carelink_core::ports::TokenStorage;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PASSWORD: &str = "CareLink2024!";

/// Path of an endpoint under the mocked API prefix.
pub fn api(endpoint: &str) -> String {
    format!("/api/{}", endpoint)
}

pub fn config_for(server: &MockServer) -> Config {
    Config {
        api_base_url: parse_base_url(&format!("{}/api", server.uri())).unwrap(),
        token_path: PathBuf::from("unused-token.json"),
        log_level: Level::WARN,
        request_timeout: Duration::from_secs(5),
    }
}

/// App state backed by an in-memory token slot, optionally pre-filled.
pub fn state_for(server: &MockServer, persisted: Option<&str>) -> (AppState, Arc<MemoryTokenStorage>) {
    let storage = Arc::new(MemoryTokenStorage::new());
    if let Some(token) = persisted {
        storage.save(token).unwrap();
    }
    let state = AppState::with_storage(config_for(server), storage.clone()).unwrap();
    (state, storage)
}

pub fn profile(email: &str, role: &str) -> Value {
    json!({
        "id": "4b7c3d8e-1f2a-4c5b-9d6e-7f8a9b0c1d2e",
        "email": email,
        "full_name": "Demo User",
        "role": role,
        "organization": {
            "id": "0e1f2a3b-4c5d-4e6f-8a9b-0c1d2e3f4a5b",
            "name": "Sunrise Family Clinic"
        }
    })
}

/// Accepts `email` with the demo password and hands out `token`.
pub async fn mount_login(server: &MockServer, email: &str, role: &str, token: &str) {
    Mock::given(method("POST"))
        .and(path(api("auth/login")))
        .and(body_json(json!({ "email": email, "password": PASSWORD })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": token,
            "user": profile(email, role),
        })))
        .mount(server)
        .await;
}

/// Rejects any other login attempt the way the backend does.
pub async fn mount_login_rejection(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(api("auth/login")))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "detail": "Incorrect email or password" })),
        )
        .mount(server)
        .await;
}

/// Initializes the session and signs in as `email`.
pub async fn signed_in(
    server: &MockServer,
    email: &str,
    role: &str,
    token: &str,
) -> (AppState, Arc<MemoryTokenStorage>) {
    mount_login(server, email, role, token).await;
    let (state, storage) = state_for(server, None);
    state.session.init().await;
    state.session.login(email, PASSWORD).await.unwrap();
    (state, storage)
}

pub fn empty_history(limit: u32) -> Value {
    json!({
        "data": [],
        "pagination": { "page": 1, "limit": limit, "total": 0, "pages": 0 }
    })
}
