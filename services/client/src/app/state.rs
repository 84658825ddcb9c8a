//! services/client/src/app/state.rs
//!
//! Defines the application's shared state: the session store and the ports
//! every screen talks to, created once at startup.

use crate::adapters::{ApiClient, AuthorizedClient, FileTokenStorage};
use crate::config::Config;
use crate::error::ClientError;
use carelink_core::ports::{EligibilityService, TokenStorage, UserDirectory};
use carelink_core::SessionStore;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Screens)
//=========================================================================================

/// The shared application state, created once at startup and passed to all screens.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: Arc<SessionStore>,
    pub eligibility: Arc<dyn EligibilityService>,
    pub users: Arc<dyn UserDirectory>,
}

impl AppState {
    /// Wires the backend client and the on-disk token slot from `config`.
    pub fn from_config(config: Config) -> Result<Self, ClientError> {
        let storage = Arc::new(FileTokenStorage::new(config.token_path.clone()));
        Self::with_storage(config, storage)
    }

    /// Same as [`AppState::from_config`] with a caller-provided token slot.
    pub fn with_storage(
        config: Config,
        storage: Arc<dyn TokenStorage>,
    ) -> Result<Self, ClientError> {
        let api = Arc::new(ApiClient::new(
            config.api_base_url.clone(),
            config.request_timeout,
        )?);
        let session = Arc::new(SessionStore::new(api.clone(), storage));
        let authorized = Arc::new(AuthorizedClient::new(api, session.clone()));

        Ok(Self {
            config: Arc::new(config),
            session,
            eligibility: authorized.clone(),
            users: authorized,
        })
    }
}
