//! services/client/src/adapters/authorized.rs
//!
//! The authorized adapter: attaches the session's bearer token to every
//! request and implements the `EligibilityService` and `UserDirectory` ports.
//!
//! When the backend answers 401, the token that was sent is handed to the
//! session store for invalidation and the call fails with
//! `PortError::SessionExpired`. There is no retry.

use async_trait::async_trait;
use carelink_core::domain::{
    EligibilityCheckRequest, EligibilityCheckResponse, EligibilityHistory, HistoryParams,
    ManagedUser, NewUser, UserUpdate,
};
use carelink_core::ports::{EligibilityService, PortError, PortResult, UserDirectory};
use carelink_core::SessionStore;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::adapters::api::{self, ApiClient};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct AuthorizedClient {
    api: Arc<ApiClient>,
    session: Arc<SessionStore>,
}

impl AuthorizedClient {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionStore>) -> Self {
        Self { api, session }
    }

    /// Sends `request` with the current token attached.
    ///
    /// Without a session nothing is sent. A 401 invalidates exactly the token
    /// that was used. If the session moved on to another token meanwhile, the
    /// newer session stays and the call fails with `Unauthorized` instead.
    async fn send(&self, request: RequestBuilder) -> PortResult<Response> {
        let token = self.session.token().ok_or(PortError::SessionExpired)?;
        let response = self.api.send(request.bearer_auth(&token)).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if self.session.invalidate(&token) {
                warn!("Request rejected with 401, session cleared");
                return Err(PortError::SessionExpired);
            }
            if self.session.is_authenticated() {
                debug!("401 for a replaced token, keeping the current session");
                return Err(PortError::Unauthorized);
            }
            return Err(PortError::SessionExpired);
        }
        Ok(response)
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> PortResult<T> {
        let response = self.send(request).await?;
        api::read_json(response).await
    }
}

//=========================================================================================
// `EligibilityService` Trait Implementation
//=========================================================================================

#[async_trait]
impl EligibilityService for AuthorizedClient {
    async fn check_eligibility(
        &self,
        request: &EligibilityCheckRequest,
    ) -> PortResult<EligibilityCheckResponse> {
        let builder = self
            .api
            .request(Method::POST, "eligibility/check")?
            .json(request);
        self.execute(builder).await
    }

    async fn get_history(&self, params: &HistoryParams) -> PortResult<EligibilityHistory> {
        let builder = self
            .api
            .request(Method::GET, "eligibility/history")?
            .query(params);
        self.execute(builder).await
    }

    async fn get_check(&self, id: Uuid) -> PortResult<EligibilityCheckResponse> {
        let builder = self
            .api
            .request(Method::GET, &format!("eligibility/{}", id))?;
        self.execute(builder).await
    }

    async fn supported_insurers(&self) -> PortResult<Vec<String>> {
        let builder = self
            .api
            .request(Method::GET, "eligibility/insurers/list")?;
        self.execute(builder).await
    }
}

//=========================================================================================
// `UserDirectory` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserDirectory for AuthorizedClient {
    async fn list_users(&self) -> PortResult<Vec<ManagedUser>> {
        let builder = self.api.request(Method::GET, "users")?;
        self.execute(builder).await
    }

    async fn get_user(&self, id: Uuid) -> PortResult<ManagedUser> {
        let builder = self.api.request(Method::GET, &format!("users/{}", id))?;
        self.execute(builder).await
    }

    async fn create_user(&self, user: &NewUser) -> PortResult<ManagedUser> {
        let builder = self.api.request(Method::POST, "users")?.json(user);
        self.execute(builder).await
    }

    async fn update_user(&self, id: Uuid, update: &UserUpdate) -> PortResult<ManagedUser> {
        let builder = self
            .api
            .request(Method::PATCH, &format!("users/{}", id))?
            .json(update);
        self.execute(builder).await
    }
}
