//! The session lifecycle controller.
//!
//! Owns the state machine of one protected surface: validates the stored
//! credential on `activate()`, optionally confirms it remotely, arms the
//! auto-expiry timer, and tears everything down on expiry or logout.
//!
//! # Stale results
//!
//! Every `activate()`, `deactivate()` and `logout()` bumps a generation
//! counter. Work that completes later (a confirmation response, a timer
//! firing) carries the generation it started under and is dropped if the
//! counter has moved on, so a response that arrives after a logout can't
//! resurrect the session.
//!
//! # Locking
//!
//! The internal mutex is never held across an `.await`, while arming a
//! timer (the scheduler may fire synchronously), or while calling the
//! [`Navigator`].

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use warden_store::TokenStore;
use warden_timer::{ExpiryHandle, ExpiryScheduler};
use warden_token::{InvalidReason, Validation, validate};

use crate::guard::effective_role;
use crate::{
    IdentityConfirmer, LifecycleState, LogoutCause, NavigationDirective, Navigator, NoConfirmation,
    SessionConfig,
};

struct Inner {
    state: LifecycleState,
    generation: u64,
    /// At most one live expiry timer, ever.
    timer: Option<ExpiryHandle>,
}

struct Shared<C> {
    store: TokenStore,
    scheduler: ExpiryScheduler,
    confirmer: C,
    navigator: Arc<dyn Navigator>,
    config: SessionConfig,
    inner: Mutex<Inner>,
    states: watch::Sender<LifecycleState>,
    transitions: broadcast::Sender<LifecycleState>,
}

/// Transitions buffered per [`SessionController::transitions`] receiver.
const TRANSITION_BUFFER: usize = 32;

/// Drives one session through its lifecycle.
///
/// Cheap to clone; clones share the same state.
///
/// ```text
/// activate() ──→ Checking ──→ Active ──(timer)──→ Expired ──→ Unauthenticated
///                   │            │                                ↑
///                   └─(invalid)──┼────────────────────────────────┤
///                                └─────────(logout)───────────────┘
/// ```
pub struct SessionController<C = NoConfirmation> {
    shared: Arc<Shared<C>>,
}

impl<C> Clone for SessionController<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: IdentityConfirmer> SessionController<C> {
    pub fn new(
        store: TokenStore,
        scheduler: ExpiryScheduler,
        confirmer: C,
        navigator: Arc<dyn Navigator>,
        config: SessionConfig,
    ) -> Self {
        let (states, _) = watch::channel(LifecycleState::Uninitialized);
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);
        Self {
            shared: Arc::new(Shared {
                store,
                scheduler,
                confirmer,
                navigator,
                config: config.validated(),
                inner: Mutex::new(Inner {
                    state: LifecycleState::Uninitialized,
                    generation: 0,
                    timer: None,
                }),
                states,
                transitions,
            }),
        }
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        self.shared.inner.lock().state.clone()
    }

    /// Observes the current state.
    ///
    /// Only the latest value is kept, so the momentary `Expired` is
    /// overwritten before a watcher can see it. Use
    /// [`transitions`](Self::transitions) to see every step.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.shared.states.subscribe()
    }

    /// Receives every transition made after this call, in order, including
    /// the momentary `Expired`.
    ///
    /// A receiver that falls more than a few dozen transitions behind gets
    /// `RecvError::Lagged` and skips ahead.
    pub fn transitions(&self) -> broadcast::Receiver<LifecycleState> {
        self.shared.transitions.subscribe()
    }

    /// The current activation generation.
    pub fn generation(&self) -> u64 {
        self.shared.inner.lock().generation
    }

    /// `true` while an expiry timer is armed and hasn't fired.
    pub fn has_live_timer(&self) -> bool {
        self.shared
            .inner
            .lock()
            .timer
            .as_ref()
            .is_some_and(ExpiryHandle::is_pending)
    }

    pub fn store(&self) -> &TokenStore {
        &self.shared.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Checks the stored credential and, if it holds, starts watching it.
    ///
    /// Any previously armed timer is cancelled first. Returns the state the
    /// controller ended up in; if another `activate()`, `deactivate()` or
    /// `logout()` overtook this call while it was waiting for confirmation,
    /// that newer state is returned and this attempt's result is dropped.
    pub async fn activate(&self) -> LifecycleState {
        let shared = &self.shared;
        let generation = {
            let mut inner = shared.inner.lock();
            inner.generation += 1;
            if let Some(old) = inner.timer.take() {
                old.cancel();
            }
            shared.transition(&mut inner, LifecycleState::Checking);
            inner.generation
        };

        let Some(token) = shared.store.get() else {
            return shared.reject(generation, InvalidReason::Missing);
        };
        let claims = match validate(Some(&token), shared.scheduler.now()) {
            Validation::Valid(claims) => claims,
            Validation::Invalid(reason) => return shared.reject(generation, reason),
        };

        if shared.config.confirm_identity {
            let result = shared.confirmer.confirm(&token).await;

            let mut inner = shared.inner.lock();
            if inner.generation != generation {
                debug!(generation, current = inner.generation, "stale confirmation discarded");
                return inner.state.clone();
            }
            match result {
                Ok(identity) => {
                    if let Some(confirmed) = identity.role {
                        if let Err(e) = shared.store.set_role(&confirmed) {
                            warn!(error = %e, "failed to persist confirmed role");
                        }
                    }
                }
                Err(e) => {
                    warn!(generation, error = %e, "identity confirmation failed");
                    shared.clear_credential();
                    shared.transition(&mut inner, LifecycleState::Unauthenticated);
                    return LifecycleState::Unauthenticated;
                }
            }
        }

        // Same derivation the guard uses, so both agree on the role.
        let role = effective_role(&claims, &shared.store);
        {
            let mut inner = shared.inner.lock();
            if inner.generation != generation {
                return inner.state.clone();
            }
            info!(generation, role = ?role, expires_at = ?claims.expires_at(), "session active");
            shared.transition(
                &mut inner,
                LifecycleState::Active {
                    role,
                    expires_at: claims.expires_at(),
                },
            );
        }

        let weak: Weak<Shared<C>> = Arc::downgrade(shared);
        let handle = shared.scheduler.schedule_claims(&claims, move || {
            if let Some(shared) = weak.upgrade() {
                shared.expire(generation);
            }
        });

        let mut inner = shared.inner.lock();
        match handle {
            Some(handle) if inner.generation == generation => inner.timer = Some(handle),
            Some(handle) => {
                handle.cancel();
            }
            None => {}
        }
        inner.state.clone()
    }

    /// Stops watching without ending the session.
    ///
    /// Cancels the live timer and invalidates any in-flight confirmation.
    /// The credential stays stored; a checking or active controller goes
    /// back to `Uninitialized` until the next `activate()`.
    pub fn deactivate(&self) {
        let shared = &self.shared;
        let mut inner = shared.inner.lock();
        inner.generation += 1;
        if let Some(timer) = inner.timer.take() {
            timer.cancel();
        }
        if matches!(
            inner.state,
            LifecycleState::Checking | LifecycleState::Active { .. }
        ) {
            shared.transition(&mut inner, LifecycleState::Uninitialized);
        }
        debug!(generation = inner.generation, "session deactivated");
    }

    /// Ends the session: cancels the timer, clears the credential, then
    /// sends the user to the entry point.
    pub fn logout(&self) -> LifecycleState {
        let shared = &self.shared;
        {
            let mut inner = shared.inner.lock();
            inner.generation += 1;
            if let Some(timer) = inner.timer.take() {
                timer.cancel();
            }
            shared.clear_credential();
            shared.transition(&mut inner, LifecycleState::Unauthenticated);
            info!(generation = inner.generation, "logged out");
        }
        shared.navigate(LogoutCause::Explicit);
        LifecycleState::Unauthenticated
    }
}

impl<C: IdentityConfirmer> Shared<C> {
    fn transition(&self, inner: &mut Inner, next: LifecycleState) {
        debug!(from = inner.state.name(), to = next.name(), "state transition");
        inner.state = next.clone();
        self.states.send_replace(next.clone());
        // No receivers is fine.
        let _ = self.transitions.send(next);
    }

    fn clear_credential(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear credential");
        }
    }

    fn navigate(&self, cause: LogoutCause) {
        self.navigator.navigate(NavigationDirective::EntryPoint {
            path: self.config.entry_point.clone(),
            cause,
        });
    }

    /// Local validation failed. Clears without navigating: the views'
    /// own `authorize()` does the redirect.
    fn reject(&self, generation: u64, reason: InvalidReason) -> LifecycleState {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return inner.state.clone();
        }
        info!(generation, %reason, "stored credential rejected");
        self.clear_credential();
        self.transition(&mut inner, LifecycleState::Unauthenticated);
        LifecycleState::Unauthenticated
    }

    /// Timer callback.
    fn expire(&self, generation: u64) {
        {
            let mut inner = self.inner.lock();
            if inner.generation != generation || !inner.state.is_active() {
                debug!(generation, current = inner.generation, "stale expiry ignored");
                return;
            }
            inner.timer = None;
            self.transition(&mut inner, LifecycleState::Expired);
            info!(generation, "session expired");
            self.clear_credential();
            self.transition(&mut inner, LifecycleState::Unauthenticated);
        }
        self.navigate(LogoutCause::Expired);
    }
}

impl<C> Drop for Shared<C> {
    fn drop(&mut self) {
        if let Some(timer) = self.inner.get_mut().timer.take() {
            timer.cancel();
        }
    }
}

impl<C> std::fmt::Debug for SessionController<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("SessionController")
            .field("state", &inner.state)
            .field("generation", &inner.generation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use warden_store::MemoryStore;
    use warden_timer::ManualClock;
    use warden_token::{UnixMillis, encode_unsigned};

    use super::*;
    use crate::{ConfirmationError, ConfirmedIdentity, RecordingNavigator, RouteGuard};

    const NOW: i64 = 1_700_000_000;

    struct Fixture<C: IdentityConfirmer> {
        clock: Arc<ManualClock>,
        navigator: Arc<RecordingNavigator>,
        controller: SessionController<C>,
    }

    fn fixture<C: IdentityConfirmer>(confirmer: C, confirm_identity: bool) -> Fixture<C> {
        let clock = Arc::new(ManualClock::at_secs(NOW));
        let navigator = Arc::new(RecordingNavigator::new());
        let store = TokenStore::new(Arc::new(MemoryStore::new()));
        let controller = SessionController::new(
            store,
            ExpiryScheduler::with_defaults(clock.clone()),
            confirmer,
            navigator.clone(),
            SessionConfig {
                confirm_identity,
                ..SessionConfig::default()
            },
        );
        Fixture {
            clock,
            navigator,
            controller,
        }
    }

    fn local() -> Fixture<NoConfirmation> {
        fixture(NoConfirmation, false)
    }

    struct Refuse;

    struct Confirms(&'static str);

    impl IdentityConfirmer for Confirms {
        async fn confirm(&self, _token: &str) -> Result<ConfirmedIdentity, ConfirmationError> {
            Ok(ConfirmedIdentity {
                role: Some(self.0.to_string()),
                ..ConfirmedIdentity::default()
            })
        }
    }

    impl IdentityConfirmer for Refuse {
        async fn confirm(&self, _token: &str) -> Result<ConfirmedIdentity, ConfirmationError> {
            Err(ConfirmationError::Status(401))
        }
    }

    fn login(controller: &SessionController<impl IdentityConfirmer>, exp: Option<i64>) {
        let mut payload = json!({"role": "employee", "sub": "e@example.com"});
        if let Some(exp) = exp {
            payload["exp"] = json!(exp);
        }
        controller.store().set_token(&encode_unsigned(&payload)).unwrap();
    }

    #[tokio::test]
    async fn test_activate_without_token_is_unauthenticated() {
        let f = local();

        let state = f.controller.activate().await;

        assert_eq!(state, LifecycleState::Unauthenticated);
        assert!(f.navigator.directives().is_empty());
    }

    #[tokio::test]
    async fn test_activate_valid_token_becomes_active_with_timer() {
        let f = local();
        login(&f.controller, Some(NOW + 60));

        let state = f.controller.activate().await;

        assert_eq!(
            state,
            LifecycleState::Active {
                role: Some("employee".into()),
                expires_at: Some(UnixMillis::from_secs(NOW + 60)),
            }
        );
        assert!(f.controller.has_live_timer());
    }

    #[tokio::test]
    async fn test_activate_token_without_exp_arms_no_timer() {
        let f = local();
        login(&f.controller, None);

        assert!(f.controller.activate().await.is_active());
        assert!(!f.controller.has_live_timer());
    }

    #[tokio::test]
    async fn test_activate_expired_token_clears_without_navigation() {
        let f = local();
        login(&f.controller, Some(NOW - 1));

        assert_eq!(f.controller.activate().await, LifecycleState::Unauthenticated);
        assert_eq!(f.controller.store().get(), None);
        assert!(f.navigator.directives().is_empty());
    }

    #[tokio::test]
    async fn test_timer_expiry_clears_then_navigates() {
        let f = local();
        login(&f.controller, Some(NOW + 60));
        f.controller.activate().await;

        f.clock.advance(Duration::from_secs(60));

        assert_eq!(f.controller.state(), LifecycleState::Unauthenticated);
        assert_eq!(f.controller.store().get(), None);
        assert_eq!(
            f.navigator.directives(),
            vec![NavigationDirective::EntryPoint {
                path: "/".into(),
                cause: LogoutCause::Expired,
            }]
        );
        assert!(!f.controller.has_live_timer());
    }

    #[tokio::test]
    async fn test_reactivate_keeps_single_live_timer() {
        let f = local();
        login(&f.controller, Some(NOW + 60));

        f.controller.activate().await;
        f.controller.activate().await;
        f.controller.activate().await;

        assert_eq!(f.clock.pending_timers(), 1);
        f.clock.advance(Duration::from_secs(60));
        assert_eq!(f.navigator.directives().len(), 1);
    }

    #[tokio::test]
    async fn test_deactivate_cancels_timer_and_keeps_credential() {
        let f = local();
        login(&f.controller, Some(NOW + 60));
        f.controller.activate().await;

        f.controller.deactivate();
        f.clock.advance(Duration::from_secs(120));

        assert_eq!(f.controller.state(), LifecycleState::Uninitialized);
        assert!(f.controller.store().get().is_some());
        assert!(f.navigator.directives().is_empty());
        assert_eq!(f.clock.pending_timers(), 0);
    }

    #[tokio::test]
    async fn test_logout_clears_and_navigates_explicit() {
        let f = local();
        login(&f.controller, Some(NOW + 60));
        f.controller.store().set_role("employee").unwrap();
        f.controller.activate().await;

        assert_eq!(f.controller.logout(), LifecycleState::Unauthenticated);

        assert_eq!(f.controller.store().get(), None);
        assert_eq!(f.controller.store().role(), None);
        assert_eq!(
            f.navigator.take(),
            vec![NavigationDirective::EntryPoint {
                path: "/".into(),
                cause: LogoutCause::Explicit,
            }]
        );
        f.clock.advance(Duration::from_secs(120));
        assert!(f.navigator.directives().is_empty());
    }

    #[tokio::test]
    async fn test_confirmation_failure_clears_credential() {
        let f = fixture(Refuse, true);
        login(&f.controller, Some(NOW + 60));

        assert_eq!(f.controller.activate().await, LifecycleState::Unauthenticated);
        assert_eq!(f.controller.store().get(), None);
        assert!(!f.controller.has_live_timer());
    }

    #[tokio::test]
    async fn test_confirmation_skipped_when_disabled() {
        let f = fixture(Refuse, false);
        login(&f.controller, Some(NOW + 60));

        assert!(f.controller.activate().await.is_active());
    }

    #[tokio::test]
    async fn test_subscribe_observes_expiry() {
        let f = local();
        login(&f.controller, Some(NOW + 1));
        let mut states = f.controller.subscribe();
        f.controller.activate().await;
        assert!(states.borrow_and_update().is_active());

        f.clock.advance(Duration::from_secs(1));

        assert!(states.has_changed().unwrap());
        assert_eq!(*states.borrow_and_update(), LifecycleState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_transitions_include_momentary_expired() {
        let f = local();
        login(&f.controller, Some(NOW + 10));
        let mut transitions = f.controller.transitions();
        f.controller.activate().await;
        assert_eq!(transitions.try_recv().unwrap(), LifecycleState::Checking);
        assert!(transitions.try_recv().unwrap().is_active());

        f.clock.advance(Duration::from_secs(10));

        let mut after_active = Vec::new();
        while let Ok(state) = transitions.try_recv() {
            after_active.push(state);
        }
        assert_eq!(
            after_active,
            vec![LifecycleState::Expired, LifecycleState::Unauthenticated]
        );
    }

    #[tokio::test]
    async fn test_active_role_matches_guard_after_reconciliation() {
        let f = fixture(Confirms("admin"), true);
        login(&f.controller, Some(NOW + 60));
        let guard = RouteGuard::new(f.controller.store().clone(), f.clock.clone());

        let state = f.controller.activate().await;

        assert_eq!(f.controller.store().role().as_deref(), Some("admin"));
        let LifecycleState::Active { role, .. } = state.clone() else {
            panic!("expected active, got {state:?}");
        };
        assert_eq!(role, guard.session().role);
        assert_eq!(role.as_deref(), Some("employee"));
        assert!(guard.authorize(role.as_deref()).is_allowed());
    }

    #[tokio::test]
    async fn test_confirmed_role_used_when_claims_have_none() {
        let f = fixture(Confirms("admin"), true);
        f.controller
            .store()
            .set_token(&encode_unsigned(&json!({"sub": "a@example.com"})))
            .unwrap();

        let state = f.controller.activate().await;

        assert_eq!(
            state,
            LifecycleState::Active {
                role: Some("admin".into()),
                expires_at: None,
            }
        );
    }

    #[tokio::test]
    async fn test_generation_bumps_on_each_lifecycle_call() {
        let f = local();
        assert_eq!(f.controller.generation(), 0);
        f.controller.activate().await;
        f.controller.deactivate();
        f.controller.logout();
        assert_eq!(f.controller.generation(), 3);
    }
}
