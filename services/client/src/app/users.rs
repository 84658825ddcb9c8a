//! services/client/src/app/users.rs
//!
//! User administration. Only admins get past the guard; the backend checks
//! the same rule again on every call.

use carelink_core::domain::{ManagedUser, NewUser, UserUpdate};
use carelink_core::guard::Route;
use carelink_core::ports::{PortError, PortResult};
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::screen::{admit, expired_to_redirect, Screen};
use crate::app::state::AppState;

#[derive(Debug, Clone)]
pub struct UsersView {
    pub users: Vec<ManagedUser>,
    pub notice: Option<String>,
}

/// Lists the organization's users, falling back to an empty list on failure.
pub async fn list(state: &AppState) -> Screen<UsersView> {
    if let Err(screen) = admit(&state.session, Route::Users) {
        return screen;
    }
    match state.users.list_users().await {
        Ok(users) => Screen::Ready(UsersView {
            users,
            notice: None,
        }),
        Err(PortError::SessionExpired) => Screen::Redirect(Route::Login),
        Err(e) => {
            warn!("Failed to load users: {}", e);
            Screen::Ready(UsersView {
                users: Vec::new(),
                notice: Some("Failed to load users".to_string()),
            })
        }
    }
}

pub async fn show(state: &AppState, id: Uuid) -> PortResult<Screen<ManagedUser>> {
    if let Err(screen) = admit(&state.session, Route::Users) {
        return Ok(screen);
    }
    expired_to_redirect(state.users.get_user(id).await)
}

pub async fn create(state: &AppState, user: &NewUser) -> PortResult<Screen<ManagedUser>> {
    if let Err(screen) = admit(&state.session, Route::Users) {
        return Ok(screen);
    }
    let result = state.users.create_user(user).await;
    if let Ok(created) = &result {
        info!(id = %created.id, role = %created.role, "User created");
    }
    expired_to_redirect(result)
}

/// Applies a partial update. An empty update is rejected without a request.
pub async fn update(
    state: &AppState,
    id: Uuid,
    update: &UserUpdate,
) -> PortResult<Screen<ManagedUser>> {
    if let Err(screen) = admit(&state.session, Route::Users) {
        return Ok(screen);
    }
    if update.is_empty() {
        return Err(PortError::Unexpected("nothing to update".to_string()));
    }
    let result = state.users.update_user(id, update).await;
    if let Ok(updated) = &result {
        info!(id = %updated.id, "User updated");
    }
    expired_to_redirect(result)
}
