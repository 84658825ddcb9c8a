//! crates/carelink_core/src/session.rs
//!
//! The session store: the single owner of the authentication state.
//!
//! The store is built explicitly and shared through an `Arc`; nothing in the
//! crate reaches for a global. Every mutation happens under one lock that is
//! never held across an `.await`, and a generation counter bumped by every
//! clearing event lets in-flight operations detect that they were superseded.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::{Role, Session, UserProfile};
use crate::guard::{self, AuthEvent, AuthState, GuardDecision, Route};
use crate::ports::{AuthService, PortError, PortResult, TokenStorage};

struct Inner {
    session: Session,
    state: AuthState,
    /// Bumped on logout, invalidation and teardown.
    generation: u64,
}

pub struct SessionStore {
    auth: Arc<dyn AuthService>,
    storage: Arc<dyn TokenStorage>,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<AuthState>,
}

impl SessionStore {
    /// Creates an empty store in the `Loading` state. Call [`SessionStore::init`]
    /// before making any guard decision.
    pub fn new(auth: Arc<dyn AuthService>, storage: Arc<dyn TokenStorage>) -> Self {
        let (state_tx, _) = watch::channel(AuthState::Loading);
        Self {
            auth,
            storage,
            inner: Mutex::new(Inner {
                session: Session::empty(),
                state: AuthState::Loading,
                generation: 0,
            }),
            state_tx,
        }
    }

    //=====================================================================================
    // Lifecycle
    //=====================================================================================

    /// Restores a persisted session, if any, and leaves the `Loading` state.
    ///
    /// A token the backend no longer accepts (or cannot be checked because the
    /// backend is unreachable) is wiped from storage. Calling this again after
    /// the state settled is a no-op.
    pub async fn init(&self) -> AuthState {
        let generation = {
            let inner = self.inner.lock();
            if inner.state != AuthState::Loading {
                debug!("Session already initialized");
                return inner.state;
            }
            inner.generation
        };

        let stored = self.storage.load().unwrap_or_else(|e| {
            warn!("Could not read the persisted token: {}", e);
            None
        });

        let Some(token) = stored else {
            debug!("No persisted token found");
            let mut inner = self.inner.lock();
            self.transition(&mut inner, AuthEvent::RestoreFailed);
            return inner.state;
        };

        let result = self.auth.current_user(&token).await;

        let mut inner = self.inner.lock();
        if inner.generation != generation || inner.state != AuthState::Loading {
            debug!("Discarding restore result, session changed while it was running");
            return inner.state;
        }
        match result {
            Ok(user) => {
                info!(email = %user.email, role = %user.role, "Session restored");
                inner.session = Session::new(token, user);
                self.transition(&mut inner, AuthEvent::Restored);
            }
            Err(e) => {
                warn!("Persisted session could not be restored: {}", e);
                if let Err(e) = self.storage.clear() {
                    warn!("Failed to clear the persisted token: {}", e);
                }
                self.transition(&mut inner, AuthEvent::RestoreFailed);
            }
        }
        inner.state
    }

    /// Drops the in-memory session at the end of the process. The persisted
    /// token is kept so the next start can restore it.
    pub fn teardown(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.session = Session::empty();
        self.transition(&mut inner, AuthEvent::LoggedOut);
        debug!("Session store torn down");
    }

    //=====================================================================================
    // Mutations
    //=====================================================================================

    /// Signs in with the given credentials.
    ///
    /// On failure the session is left exactly as it was and the backend's
    /// error is returned. If a logout lands while the request is in flight,
    /// the result is discarded and `PortError::Superseded` is returned.
    /// Between two racing logins, the last one to resolve wins.
    pub async fn login(&self, email: &str, password: &str) -> PortResult<UserProfile> {
        let generation = self.inner.lock().generation;

        let response = self.auth.login(email, password).await?;

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            info!(email = %email, "Discarding login that completed after sign-out");
            return Err(PortError::Superseded);
        }
        if let Err(e) = self.storage.save(&response.token) {
            // The session still works for this run; it just won't survive a restart.
            warn!("Failed to persist the session token: {}", e);
        }
        info!(email = %response.user.email, role = %response.user.role, "Signed in");
        let user = response.user.clone();
        inner.session = Session::new(response.token, response.user);
        self.transition(&mut inner, AuthEvent::LoggedIn);
        Ok(user)
    }

    /// Clears the session and the persisted token. Safe to call any number of times.
    pub fn logout(&self) {
        let mut inner = self.inner.lock();
        if inner.session.is_authenticated() {
            info!("Signed out");
        }
        self.clear(&mut inner, AuthEvent::LoggedOut);
    }

    /// Ends the session because the backend rejected `token`.
    ///
    /// Only clears if the session still holds that token, so a late 401 for a
    /// token that was already replaced or cleared does nothing. Returns
    /// whether the session was cleared.
    pub fn invalidate(&self, token: &str) -> bool {
        let mut inner = self.inner.lock();
        if inner.session.token() != Some(token) {
            debug!("Ignoring rejection of a token the session no longer holds");
            return false;
        }
        warn!("Session token rejected by the backend, signing out");
        self.clear(&mut inner, AuthEvent::Invalidated);
        true
    }

    /// Exchanges the current token for a fresh one.
    ///
    /// A rejected token ends the session like any other 401. The new token is
    /// only kept if the session still holds the token that was refreshed.
    pub async fn refresh(&self) -> PortResult<()> {
        let token = self.token().ok_or(PortError::SessionExpired)?;

        let fresh = match self.auth.refresh_token(&token).await {
            Ok(fresh) => fresh,
            Err(PortError::Unauthorized) => {
                self.invalidate(&token);
                return Err(PortError::SessionExpired);
            }
            Err(e) => return Err(e),
        };

        let mut inner = self.inner.lock();
        if inner.session.token() != Some(token.as_str()) {
            debug!("Discarding refreshed token, session changed while refreshing");
            return Err(PortError::Superseded);
        }
        if let Err(e) = self.storage.save(&fresh) {
            warn!("Failed to persist the refreshed token: {}", e);
        }
        inner.session.replace_token(fresh);
        debug!("Session token refreshed");
        Ok(())
    }

    //=====================================================================================
    // Reads
    //=====================================================================================

    /// A snapshot of the current session.
    pub fn session(&self) -> Session {
        self.inner.lock().session.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.lock().session.token().map(str::to_string)
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.inner.lock().session.user().cloned()
    }

    pub fn role(&self) -> Role {
        self.inner.lock().session.role()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.lock().session.is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.lock().state == AuthState::Loading
    }

    pub fn auth_state(&self) -> AuthState {
        self.inner.lock().state
    }

    /// Watches state transitions.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    /// Waits until startup restoration has settled.
    pub async fn settled(&self) -> AuthState {
        let mut rx = self.subscribe();
        let settled = rx
            .wait_for(|state| *state != AuthState::Loading)
            .await
            .map(|state| *state);
        // The sender lives as long as `self`, so this only errs mid-drop.
        settled.unwrap_or_else(|_| self.auth_state())
    }

    /// The guard decision for `route`, taken from one consistent snapshot.
    pub fn decide(&self, route: Route) -> GuardDecision {
        let inner = self.inner.lock();
        guard::decide(inner.state, inner.session.role(), route)
    }

    /// Like [`SessionStore::decide`], for a raw path.
    pub fn decide_path(&self, path: &str) -> GuardDecision {
        let inner = self.inner.lock();
        guard::decide_path(inner.state, inner.session.role(), path)
    }

    //=====================================================================================
    // Internals
    //=====================================================================================

    fn clear(&self, inner: &mut Inner, event: AuthEvent) {
        inner.generation += 1;
        inner.session = Session::empty();
        if let Err(e) = self.storage.clear() {
            warn!("Failed to clear the persisted token: {}", e);
        }
        self.transition(inner, event);
    }

    fn transition(&self, inner: &mut Inner, event: AuthEvent) {
        let next = inner.state.apply(event);
        if next != inner.state {
            debug!(from = ?inner.state, to = ?next, ?event, "Auth state transition");
            inner.state = next;
            self.state_tx.send_replace(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LoginResponse, Organization};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use tokio::sync::Notify;
    use uuid::Uuid;

    //=====================================================================================
    // Fakes
    //=====================================================================================

    #[derive(Default)]
    struct MemoryStorage {
        slot: Mutex<Option<String>>,
        fail_writes: bool,
    }

    impl MemoryStorage {
        fn with_token(token: &str) -> Self {
            Self {
                slot: Mutex::new(Some(token.to_string())),
                fail_writes: false,
            }
        }

        fn get(&self) -> Option<String> {
            self.slot.lock().clone()
        }
    }

    impl TokenStorage for MemoryStorage {
        fn load(&self) -> PortResult<Option<String>> {
            Ok(self.slot.lock().clone())
        }

        fn save(&self, token: &str) -> PortResult<()> {
            if self.fail_writes {
                return Err(PortError::Storage("read-only".into()));
            }
            *self.slot.lock() = Some(token.to_string());
            Ok(())
        }

        fn clear(&self) -> PortResult<()> {
            *self.slot.lock() = None;
            Ok(())
        }
    }

    /// Gate that parks a login until the test releases it.
    struct Gate {
        entered: Notify,
        release: Notify,
    }

    struct FakeAuth {
        password: &'static str,
        accepted_tokens: Mutex<HashSet<String>>,
        issued: Mutex<u32>,
        gate: Option<Arc<Gate>>,
        /// Only logins for this email wait on the gate; `None` gates all of them.
        gated_email: Option<&'static str>,
    }

    impl FakeAuth {
        fn new() -> Self {
            Self {
                password: "CareLink2024!",
                accepted_tokens: Mutex::new(HashSet::new()),
                issued: Mutex::new(0),
                gate: None,
                gated_email: None,
            }
        }

        fn accepting(token: &str) -> Self {
            let auth = Self::new();
            auth.accepted_tokens.lock().insert(token.to_string());
            auth
        }

        fn gated(gate: Arc<Gate>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new()
            }
        }

        fn gated_for(gate: Arc<Gate>, email: &'static str) -> Self {
            Self {
                gated_email: Some(email),
                ..Self::gated(gate)
            }
        }

        fn next_token(&self) -> String {
            let mut issued = self.issued.lock();
            *issued += 1;
            let token = format!("token-{}", *issued);
            self.accepted_tokens.lock().insert(token.clone());
            token
        }
    }

    fn profile(email: &str) -> UserProfile {
        let role = Role::parse(email.split('@').next().unwrap_or_default());
        UserProfile {
            id: Uuid::new_v4(),
            email: email.to_string(),
            full_name: "Demo User".to_string(),
            role,
            organization: Organization {
                id: Uuid::nil(),
                name: "Sunrise Family Clinic".to_string(),
            },
        }
    }

    #[async_trait]
    impl AuthService for FakeAuth {
        async fn login(&self, email: &str, password: &str) -> PortResult<LoginResponse> {
            if let Some(gate) = &self.gate {
                if self.gated_email.map_or(true, |gated| gated == email) {
                    gate.entered.notify_one();
                    gate.release.notified().await;
                }
            }
            if password != self.password {
                return Err(PortError::InvalidCredentials(
                    "Incorrect email or password".into(),
                ));
            }
            Ok(LoginResponse {
                token: self.next_token(),
                user: profile(email),
            })
        }

        async fn current_user(&self, token: &str) -> PortResult<UserProfile> {
            if self.accepted_tokens.lock().contains(token) {
                Ok(profile("staff@carelink.demo"))
            } else {
                Err(PortError::Unauthorized)
            }
        }

        async fn refresh_token(&self, token: &str) -> PortResult<String> {
            if self.accepted_tokens.lock().contains(token) {
                Ok(self.next_token())
            } else {
                Err(PortError::Unauthorized)
            }
        }
    }

    fn store(auth: FakeAuth, storage: Arc<MemoryStorage>) -> SessionStore {
        SessionStore::new(Arc::new(auth), storage)
    }

    fn assert_consistent(store: &SessionStore) {
        let session = store.session();
        assert_eq!(
            session.is_authenticated(),
            session.token().is_some() && session.user().is_some()
        );
        assert_eq!(session.token().is_some(), session.user().is_some());
    }

    //=====================================================================================
    // Tests
    //=====================================================================================

    #[tokio::test]
    async fn init_without_token_settles_unauthenticated() {
        let storage = Arc::new(MemoryStorage::default());
        let store = store(FakeAuth::new(), storage);
        assert!(store.is_loading());
        assert_eq!(store.decide(Route::Dashboard), GuardDecision::Wait);

        assert_eq!(store.init().await, AuthState::Unauthenticated);
        assert!(!store.is_loading());
        assert_eq!(
            store.decide(Route::Dashboard),
            GuardDecision::Redirect(Route::Login)
        );
    }

    #[tokio::test]
    async fn init_restores_accepted_token() {
        let storage = Arc::new(MemoryStorage::with_token("persisted"));
        let store = store(FakeAuth::accepting("persisted"), storage.clone());

        assert_eq!(store.init().await, AuthState::Authenticated);
        assert_eq!(store.token().as_deref(), Some("persisted"));
        assert_eq!(store.role(), Role::Staff);
        assert_eq!(storage.get().as_deref(), Some("persisted"));
        assert_consistent(&store);
    }

    #[tokio::test]
    async fn init_with_rejected_token_clears_storage() {
        let storage = Arc::new(MemoryStorage::with_token("expired"));
        let store = store(FakeAuth::new(), storage.clone());

        assert_eq!(store.init().await, AuthState::Unauthenticated);
        assert!(storage.get().is_none());
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn settled_resolves_after_init() {
        let storage = Arc::new(MemoryStorage::default());
        let store = store(FakeAuth::new(), storage);
        let (settled, _) = tokio::join!(store.settled(), store.init());
        assert_eq!(settled, AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn login_populates_and_persists() {
        let storage = Arc::new(MemoryStorage::default());
        let store = store(FakeAuth::new(), storage.clone());
        store.init().await;

        let user = store
            .login("admin@carelink.demo", "CareLink2024!")
            .await
            .unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(store.auth_state(), AuthState::Authenticated);
        assert_eq!(storage.get(), store.token());
        assert_eq!(store.decide(Route::Users), GuardDecision::Render(Route::Users));
        assert_consistent(&store);
    }

    #[tokio::test]
    async fn failed_login_leaves_existing_session_alone() {
        let storage = Arc::new(MemoryStorage::default());
        let store = store(FakeAuth::new(), storage.clone());
        store.init().await;
        store
            .login("staff@carelink.demo", "CareLink2024!")
            .await
            .unwrap();
        let before = store.session();

        let err = store
            .login("admin@carelink.demo", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::InvalidCredentials(_)));
        assert_eq!(store.session(), before);
        assert_eq!(storage.get().as_deref(), before.token());
        assert_eq!(store.auth_state(), AuthState::Authenticated);
    }

    #[tokio::test]
    async fn login_then_logout_always_ends_empty() {
        let storage = Arc::new(MemoryStorage::default());
        let store = store(FakeAuth::new(), storage.clone());
        store.init().await;

        for _ in 0..5 {
            store
                .login("staff@carelink.demo", "CareLink2024!")
                .await
                .unwrap();
            store.logout();
            assert_eq!(store.session(), Session::empty());
            assert!(storage.get().is_none());
            assert_eq!(store.auth_state(), AuthState::Unauthenticated);
        }
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let storage = Arc::new(MemoryStorage::default());
        let store = store(FakeAuth::new(), storage.clone());
        store.init().await;
        store
            .login("viewer@carelink.demo", "CareLink2024!")
            .await
            .unwrap();

        store.logout();
        let once = (store.session(), store.auth_state(), storage.get());
        store.logout();
        let twice = (store.session(), store.auth_state(), storage.get());
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn login_resolving_after_logout_is_discarded() {
        let gate = Arc::new(Gate {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let storage = Arc::new(MemoryStorage::default());
        let store = store(FakeAuth::gated(gate.clone()), storage.clone());
        store.init().await;

        let (result, _) = tokio::join!(
            store.login("admin@carelink.demo", "CareLink2024!"),
            async {
                gate.entered.notified().await;
                store.logout();
                gate.release.notify_one();
            }
        );

        assert_eq!(result.unwrap_err(), PortError::Superseded);
        assert!(!store.is_authenticated());
        assert!(storage.get().is_none());
        assert_eq!(store.auth_state(), AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn racing_logins_last_to_resolve_wins() {
        let gate = Arc::new(Gate {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let storage = Arc::new(MemoryStorage::default());
        let store = store(
            FakeAuth::gated_for(gate.clone(), "staff@carelink.demo"),
            storage.clone(),
        );
        store.init().await;

        let (slow, fast) = tokio::join!(
            store.login("staff@carelink.demo", "CareLink2024!"),
            async {
                gate.entered.notified().await;
                let fast = store.login("admin@carelink.demo", "CareLink2024!").await;
                assert_eq!(store.role(), Role::Admin);
                gate.release.notify_one();
                fast
            }
        );

        assert_eq!(fast.unwrap().role, Role::Admin);
        assert_eq!(slow.unwrap().role, Role::Staff);
        assert_eq!(store.role(), Role::Staff);
        assert_eq!(storage.get(), store.token());
        assert_consistent(&store);
    }

    #[tokio::test]
    async fn login_during_restore_wins() {
        let storage = Arc::new(MemoryStorage::default());
        let store = store(FakeAuth::new(), storage);
        store
            .login("admin@carelink.demo", "CareLink2024!")
            .await
            .unwrap();
        assert_eq!(store.auth_state(), AuthState::Authenticated);
        // The restore that was pending is now a no-op.
        assert_eq!(store.init().await, AuthState::Authenticated);
        assert_eq!(store.role(), Role::Admin);
    }

    #[tokio::test]
    async fn invalidate_only_clears_the_matching_token() {
        let storage = Arc::new(MemoryStorage::default());
        let store = store(FakeAuth::new(), storage.clone());
        store.init().await;
        store
            .login("staff@carelink.demo", "CareLink2024!")
            .await
            .unwrap();
        let first = store.token().unwrap();
        store
            .login("staff@carelink.demo", "CareLink2024!")
            .await
            .unwrap();

        assert!(!store.invalidate(&first));
        assert!(store.is_authenticated());

        let current = store.token().unwrap();
        assert!(store.invalidate(&current));
        assert!(!store.invalidate(&current));
        assert!(!store.is_authenticated());
        assert!(storage.get().is_none());
        assert_eq!(
            store.decide(Route::Dashboard),
            GuardDecision::Redirect(Route::Login)
        );
    }

    #[tokio::test]
    async fn refresh_replaces_token_and_keeps_profile() {
        let storage = Arc::new(MemoryStorage::default());
        let store = store(FakeAuth::new(), storage.clone());
        store.init().await;
        let user = store
            .login("staff@carelink.demo", "CareLink2024!")
            .await
            .unwrap();
        let old = store.token().unwrap();

        store.refresh().await.unwrap();
        let new = store.token().unwrap();
        assert_ne!(old, new);
        assert_eq!(store.user(), Some(user));
        assert_eq!(storage.get(), Some(new));
    }

    #[tokio::test]
    async fn refresh_without_session_is_expired() {
        let store = store(FakeAuth::new(), Arc::new(MemoryStorage::default()));
        store.init().await;
        assert_eq!(store.refresh().await.unwrap_err(), PortError::SessionExpired);
    }

    #[tokio::test]
    async fn storage_write_failure_does_not_fail_login() {
        let storage = Arc::new(MemoryStorage {
            fail_writes: true,
            ..Default::default()
        });
        let store = store(FakeAuth::new(), storage.clone());
        store.init().await;
        store
            .login("staff@carelink.demo", "CareLink2024!")
            .await
            .unwrap();
        assert!(store.is_authenticated());
        assert!(storage.get().is_none());
    }

    #[tokio::test]
    async fn teardown_keeps_persisted_token() {
        let storage = Arc::new(MemoryStorage::default());
        let store = store(FakeAuth::new(), storage.clone());
        store.init().await;
        store
            .login("staff@carelink.demo", "CareLink2024!")
            .await
            .unwrap();
        let token = store.token();

        store.teardown();
        assert!(!store.is_authenticated());
        assert_eq!(storage.get(), token);
    }

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let store = store(FakeAuth::new(), Arc::new(MemoryStorage::default()));
        let mut rx = store.subscribe();
        assert_eq!(*rx.borrow(), AuthState::Loading);

        store.init().await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), AuthState::Unauthenticated);

        store
            .login("staff@carelink.demo", "CareLink2024!")
            .await
            .unwrap();
        assert_eq!(*rx.borrow_and_update(), AuthState::Authenticated);
    }
}
