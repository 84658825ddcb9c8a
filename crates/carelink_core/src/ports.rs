//! crates/carelink_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core depends on.
//! These traits form the boundary of the hexagonal architecture: the session
//! store and the screens only see these ports, never a concrete HTTP client
//! or storage backend.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    EligibilityCheckRequest, EligibilityCheckResponse, EligibilityHistory, HistoryParams,
    LoginResponse, ManagedUser, NewUser, UserProfile, UserUpdate,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (network, disk).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    /// The backend rejected the token handed to it explicitly (restore, refresh).
    #[error("Unauthorized")]
    Unauthorized,
    /// The backend rejected submitted credentials. Never ends a session.
    #[error("{0}")]
    InvalidCredentials(String),
    /// The session token was rejected on an authorized call; the session has
    /// been cleared and the caller should route to the login screen.
    #[error("Session expired, please sign in again")]
    SessionExpired,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Network error: {0}")]
    Network(String),
    /// A logout or invalidation happened while this operation was in flight,
    /// so its result was discarded.
    #[error("Operation superseded by a newer session change")]
    Superseded,
    #[error("Token storage error: {0}")]
    Storage(String),
}

impl PortError {
    /// True for failures that end the session and should send the user to login.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, PortError::SessionExpired)
    }

    /// True for failures a screen should absorb into a fallback state.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PortError::Network(_) | PortError::Unexpected(_) | PortError::NotFound(_)
        )
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Authentication endpoints. Every call takes its credential explicitly, so a
/// failure here never invalidates the current session on its own.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Exchanges credentials for a token and profile.
    async fn login(&self, email: &str, password: &str) -> PortResult<LoginResponse>;

    /// Fetches the profile behind `token` ("who am I").
    async fn current_user(&self, token: &str) -> PortResult<UserProfile>;

    /// Exchanges `token` for a fresh one.
    async fn refresh_token(&self, token: &str) -> PortResult<String>;
}

/// The single durable slot holding the bearer token between runs.
///
/// Synchronous on purpose: the session store writes it while holding its
/// state lock so a logout can never be overtaken by a login's write.
pub trait TokenStorage: Send + Sync {
    fn load(&self) -> PortResult<Option<String>>;
    fn save(&self, token: &str) -> PortResult<()>;
    fn clear(&self) -> PortResult<()>;
}

#[async_trait]
pub trait EligibilityService: Send + Sync {
    /// Runs a verification against the payer for one patient.
    async fn check_eligibility(
        &self,
        request: &EligibilityCheckRequest,
    ) -> PortResult<EligibilityCheckResponse>;

    async fn get_history(&self, params: &HistoryParams) -> PortResult<EligibilityHistory>;

    async fn get_check(&self, id: Uuid) -> PortResult<EligibilityCheckResponse>;

    /// Names of the payers the backend can verify against.
    async fn supported_insurers(&self) -> PortResult<Vec<String>>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_users(&self) -> PortResult<Vec<ManagedUser>>;

    async fn get_user(&self, id: Uuid) -> PortResult<ManagedUser>;

    async fn create_user(&self, user: &NewUser) -> PortResult<ManagedUser>;

    async fn update_user(&self, id: Uuid, update: &UserUpdate) -> PortResult<ManagedUser>;
}
