//! crates/carelink_core/src/guard.rs
//!
//! The route guard: the authentication state machine and the navigation
//! decision derived from it.

use std::fmt;

use crate::capability::{self, AccessDenied, Destination};
use crate::domain::Role;

//=========================================================================================
// Authentication State Machine
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Startup restoration has not settled yet.
    Loading,
    Authenticated,
    Unauthenticated,
}

/// Something that happened to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// Startup found a persisted token and the backend accepted it.
    Restored,
    /// Startup found no usable token.
    RestoreFailed,
    LoggedIn,
    LoggedOut,
    /// The HTTP adapter saw the session token rejected.
    Invalidated,
}

impl AuthState {
    /// Applies `event` and returns the next state.
    ///
    /// Restore events only count while loading. A login that lands while
    /// still loading wins over the pending restore.
    pub fn apply(self, event: AuthEvent) -> AuthState {
        match (self, event) {
            (AuthState::Loading, AuthEvent::Restored) => AuthState::Authenticated,
            (AuthState::Loading, AuthEvent::RestoreFailed) => AuthState::Unauthenticated,
            (state, AuthEvent::Restored | AuthEvent::RestoreFailed) => state,
            (_, AuthEvent::LoggedIn) => AuthState::Authenticated,
            (_, AuthEvent::LoggedOut | AuthEvent::Invalidated) => AuthState::Unauthenticated,
        }
    }
}

//=========================================================================================
// Routes
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Landing,
    Login,
    Dashboard,
    EligibilityCheck,
    History,
    Users,
}

impl Route {
    /// Resolves a path. Unknown paths yield `None` and are sent to the landing page.
    pub fn parse(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Some(Route::Landing),
            "/login" => Some(Route::Login),
            "/app" => Some(Route::Dashboard),
            "/app/check" => Some(Route::EligibilityCheck),
            "/app/history" => Some(Route::History),
            "/app/users" => Some(Route::Users),
            _ => None,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::Login => "/login",
            Route::Dashboard => "/app",
            Route::EligibilityCheck => "/app/check",
            Route::History => "/app/history",
            Route::Users => "/app/users",
        }
    }

    pub fn is_protected(&self) -> bool {
        self.destination().is_some()
    }

    /// The gated destination behind a protected route.
    pub fn destination(&self) -> Option<Destination> {
        match self {
            Route::Landing | Route::Login => None,
            Route::Dashboard => Some(Destination::Dashboard),
            Route::EligibilityCheck => Some(Destination::EligibilityCheck),
            Route::History => Some(Destination::History),
            Route::Users => Some(Destination::UserManagement),
        }
    }

    pub fn for_destination(destination: Destination) -> Route {
        match destination {
            Destination::Dashboard => Route::Dashboard,
            Destination::EligibilityCheck => Route::EligibilityCheck,
            Destination::History => Route::History,
            Destination::UserManagement => Route::Users,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

//=========================================================================================
// Guard Decisions
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Restoration still running; show a neutral waiting indicator.
    Wait,
    Render(Route),
    /// Navigate elsewhere. The attempted path is not remembered.
    Redirect(Route),
    /// The route is reachable but the role may not use it.
    Blocked(AccessDenied),
}

/// Decides what happens when navigating to `route`.
///
/// `role` is only consulted once the session is authenticated.
pub fn decide(state: AuthState, role: Role, route: Route) -> GuardDecision {
    let Some(destination) = route.destination() else {
        return GuardDecision::Render(route);
    };
    match state {
        AuthState::Loading => GuardDecision::Wait,
        AuthState::Unauthenticated => GuardDecision::Redirect(Route::Login),
        AuthState::Authenticated => match capability::denial(role, destination) {
            Some(denied) => GuardDecision::Blocked(denied),
            None => GuardDecision::Render(route),
        },
    }
}

/// Like [`decide`], for a raw path. Unknown paths redirect to the landing page.
pub fn decide_path(state: AuthState, role: Role, path: &str) -> GuardDecision {
    match Route::parse(path) {
        Some(route) => decide(state, role, route),
        None => GuardDecision::Redirect(Route::Landing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROTECTED: [Route; 4] = [
        Route::Dashboard,
        Route::EligibilityCheck,
        Route::History,
        Route::Users,
    ];

    #[test]
    fn loading_never_renders_or_redirects_protected_routes() {
        for role in [Role::Admin, Role::Staff, Role::Viewer, Role::Unknown] {
            for route in PROTECTED {
                assert_eq!(decide(AuthState::Loading, role, route), GuardDecision::Wait);
            }
        }
    }

    #[test]
    fn unauthenticated_redirects_to_login() {
        for route in PROTECTED {
            assert_eq!(
                decide(AuthState::Unauthenticated, Role::Admin, route),
                GuardDecision::Redirect(Route::Login)
            );
        }
    }

    #[test]
    fn public_routes_always_render() {
        for state in [
            AuthState::Loading,
            AuthState::Authenticated,
            AuthState::Unauthenticated,
        ] {
            assert_eq!(
                decide(state, Role::Unknown, Route::Login),
                GuardDecision::Render(Route::Login)
            );
            assert_eq!(
                decide(state, Role::Unknown, Route::Landing),
                GuardDecision::Render(Route::Landing)
            );
        }
    }

    #[test]
    fn authenticated_consults_capability_gate() {
        assert_eq!(
            decide(AuthState::Authenticated, Role::Admin, Route::Users),
            GuardDecision::Render(Route::Users)
        );
        match decide(AuthState::Authenticated, Role::Viewer, Route::EligibilityCheck) {
            GuardDecision::Blocked(denied) => {
                assert_eq!(denied.destination, Destination::EligibilityCheck)
            }
            other => panic!("expected blocked, got {other:?}"),
        }
        assert!(matches!(
            decide(AuthState::Authenticated, Role::Staff, Route::Users),
            GuardDecision::Blocked(_)
        ));
    }

    #[test]
    fn unknown_paths_go_to_landing() {
        assert_eq!(
            decide_path(AuthState::Authenticated, Role::Admin, "/nowhere"),
            GuardDecision::Redirect(Route::Landing)
        );
        assert_eq!(
            decide_path(AuthState::Unauthenticated, Role::Admin, "/app/history/?page=2"),
            GuardDecision::Redirect(Route::Login)
        );
    }

    #[test]
    fn transitions() {
        use AuthEvent::*;
        use AuthState::*;
        assert_eq!(Loading.apply(Restored), Authenticated);
        assert_eq!(Loading.apply(RestoreFailed), Unauthenticated);
        assert_eq!(Loading.apply(LoggedIn), Authenticated);
        assert_eq!(Authenticated.apply(LoggedOut), Unauthenticated);
        assert_eq!(Authenticated.apply(Invalidated), Unauthenticated);
        assert_eq!(Unauthenticated.apply(LoggedIn), Authenticated);
        assert_eq!(Unauthenticated.apply(LoggedOut), Unauthenticated);
        // A late restore result does not override a settled state.
        assert_eq!(Unauthenticated.apply(Restored), Unauthenticated);
        assert_eq!(Authenticated.apply(RestoreFailed), Authenticated);
    }

    #[test]
    fn route_paths_round_trip() {
        for route in PROTECTED.into_iter().chain([Route::Landing, Route::Login]) {
            assert_eq!(Route::parse(route.path()), Some(route));
        }
    }
}
