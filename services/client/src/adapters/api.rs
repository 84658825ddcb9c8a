//! services/client/src/adapters/api.rs
//!
//! This module contains the backend API client: the thin reqwest wrapper every
//! other adapter sends through, and the concrete implementation of the
//! `AuthService` port from the `core` crate.
//!
//! Calls made here carry their credential explicitly. A 401 from them is
//! reported to the caller but never ends the session by itself; that is the
//! job of the authorized adapter.

use async_trait::async_trait;
use carelink_core::domain::{LoginResponse, UserProfile};
use carelink_core::ports::{AuthService, PortError, PortResult};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A client for the CareLink backend that implements the `AuthService` port.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Creates a new `ApiClient`. `base_url` must end with a slash.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("carelink/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Starts a request to `path`, relative to the base URL.
    pub fn request(&self, method: Method, path: &str) -> PortResult<RequestBuilder> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| PortError::Unexpected(format!("invalid endpoint '{}': {}", path, e)))?;
        Ok(self.http.request(method, url))
    }

    /// Sends a request. Only transport failures are errors here; any HTTP
    /// status comes back as a response.
    pub async fn send(&self, builder: RequestBuilder) -> PortResult<Response> {
        let request = builder
            .build()
            .map_err(|e| PortError::Unexpected(format!("failed to build request: {}", e)))?;
        debug!(method = %request.method(), path = %request.url().path(), "Sending request");
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;
        debug!(status = %response.status(), "Received response");
        Ok(response)
    }
}

//=========================================================================================
// Response Helpers
//=========================================================================================

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// Reads the backend's `detail` message, falling back to the status text.
pub async fn error_detail(response: Response) -> String {
    let status = response.status();
    let fallback = status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string();
    match response.json::<ErrorBody>().await {
        Ok(ErrorBody {
            detail: serde_json::Value::String(message),
        }) => message,
        Ok(ErrorBody { detail }) if !detail.is_null() => detail.to_string(),
        _ => fallback,
    }
}

/// Maps a non-success status to a port error.
pub fn status_error(status: StatusCode, detail: String) -> PortError {
    match status {
        StatusCode::UNAUTHORIZED => PortError::Unauthorized,
        StatusCode::FORBIDDEN => PortError::Forbidden(detail),
        StatusCode::NOT_FOUND => PortError::NotFound(detail),
        _ => PortError::Unexpected(format!("{} ({})", detail, status.as_u16())),
    }
}

/// Turns a response into `T`, or into a port error for non-success statuses.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> PortResult<T> {
    let status = response.status();
    if !status.is_success() {
        let detail = error_detail(response).await;
        return Err(status_error(status, detail));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| PortError::Unexpected(format!("malformed response body: {}", e)))
}

//=========================================================================================
// Request Payloads
//=========================================================================================

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize, Deserialize)]
struct TokenRefresh {
    token: String,
}

//=========================================================================================
// `AuthService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthService for ApiClient {
    /// POST /auth/login. A 401 here means the credentials were wrong.
    async fn login(&self, email: &str, password: &str) -> PortResult<LoginResponse> {
        let request = self
            .request(Method::POST, "auth/login")?
            .json(&LoginRequest { email, password });
        let response = self.send(request).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let detail = error_detail(response).await;
            return Err(PortError::InvalidCredentials(detail));
        }
        read_json(response).await
    }

    /// GET /auth/me with `token` as the bearer credential.
    async fn current_user(&self, token: &str) -> PortResult<UserProfile> {
        let request = self.request(Method::GET, "auth/me")?.bearer_auth(token);
        let response = self.send(request).await?;
        read_json(response).await
    }

    /// POST /auth/refresh.
    async fn refresh_token(&self, token: &str) -> PortResult<String> {
        let request = self
            .request(Method::POST, "auth/refresh")?
            .json(&TokenRefresh {
                token: token.to_string(),
            });
        let response = self.send(request).await?;
        let body: TokenRefresh = read_json(response).await?;
        Ok(body.token)
    }
}
