//! services/client/src/app/screen.rs
//!
//! The outcome of opening a screen, and the guard check every screen runs first.

use carelink_core::capability::AccessDenied;
use carelink_core::guard::{GuardDecision, Route};
use carelink_core::ports::PortError;
use carelink_core::SessionStore;

/// What the user ends up looking at.
#[derive(Debug)]
pub enum Screen<V> {
    /// Session restoration is still running.
    Waiting,
    Ready(V),
    /// The role may not use this screen.
    Blocked(AccessDenied),
    /// Go somewhere else instead (login after a sign-out or expired session).
    Redirect(Route),
}

impl<V> Screen<V> {
    pub fn ready(self) -> Option<V> {
        match self {
            Screen::Ready(view) => Some(view),
            _ => None,
        }
    }

    pub fn is_redirect_to(&self, route: Route) -> bool {
        matches!(self, Screen::Redirect(r) if *r == route)
    }
}

/// Runs the route guard for `route`; `Err` carries the screen to show instead.
pub fn admit<V>(session: &SessionStore, route: Route) -> Result<(), Screen<V>> {
    match session.decide(route) {
        GuardDecision::Render(_) => Ok(()),
        GuardDecision::Wait => Err(Screen::Waiting),
        GuardDecision::Redirect(to) => Err(Screen::Redirect(to)),
        GuardDecision::Blocked(denied) => Err(Screen::Blocked(denied)),
    }
}

/// For actions whose failures are shown to the user: an expired session
/// becomes a redirect, anything else stays an error.
pub fn expired_to_redirect<V>(result: Result<V, PortError>) -> Result<Screen<V>, PortError> {
    match result {
        Ok(view) => Ok(Screen::Ready(view)),
        Err(PortError::SessionExpired) => Ok(Screen::Redirect(Route::Login)),
        Err(e) => Err(e),
    }
}
