//! `SessionAuthority` builder and facade.
//!
//! Ties the layers together: storage → token store → guard, and clock →
//! scheduler → controller, all sharing one persisted credential.

use std::sync::Arc;

use warden_session::{
    Authorization, IdentityConfirmer, LifecycleState, Navigator, NoConfirmation, RouteDecision,
    RouteGuard, RouteTable, SessionConfig, SessionController, SessionSnapshot, TracingNavigator,
};
use warden_store::{KeyValueStore, LoginGrant, MemoryStore, StorageKeys, TokenStore};
use warden_timer::{Clock, ExpiryScheduler, SchedulerConfig, TokioClock};
use warden_token::{Claims, decode};

use crate::WardenError;

/// Builder for a [`SessionAuthority`].
///
/// Every piece has a default: in-memory storage, the Tokio clock of the
/// current runtime, a navigator that only logs, and default configs.
///
/// # Example
///
/// ```rust,ignore
/// let authority = SessionAuthority::builder()
///     .storage(FileStore::open(path)?)
///     .navigator(Arc::new(MyRouter))
///     .build_with(HttpConfirmer::new(&HttpConfirmerConfig::new(api))?)?;
/// ```
pub struct SessionAuthorityBuilder {
    storage: Option<Arc<dyn KeyValueStore>>,
    keys: StorageKeys,
    clock: Option<Arc<dyn Clock>>,
    navigator: Option<Arc<dyn Navigator>>,
    scheduler_config: SchedulerConfig,
    session_config: SessionConfig,
}

impl SessionAuthorityBuilder {
    pub fn new() -> Self {
        Self {
            storage: None,
            keys: StorageKeys::default(),
            clock: None,
            navigator: None,
            scheduler_config: SchedulerConfig::default(),
            session_config: SessionConfig::default(),
        }
    }

    /// Sets where the credential is persisted.
    pub fn storage(mut self, storage: impl KeyValueStore) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    /// Shares an existing storage backend with other components.
    pub fn shared_storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Overrides the storage key names.
    pub fn keys(mut self, keys: StorageKeys) -> Self {
        self.keys = keys;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn scheduler_config(mut self, config: SchedulerConfig) -> Self {
        self.scheduler_config = config;
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Builds an authority that trusts local validation alone.
    ///
    /// # Errors
    /// [`WardenError::NoRuntime`] if no clock was set and this isn't called
    /// from inside a Tokio runtime.
    pub fn build(mut self) -> Result<SessionAuthority<NoConfirmation>, WardenError> {
        self.session_config.confirm_identity = false;
        self.build_with(NoConfirmation)
    }

    /// Builds an authority that confirms identity with `confirmer` on
    /// every activation (unless the session config turns that off).
    pub fn build_with<C: IdentityConfirmer>(
        self,
        confirmer: C,
    ) -> Result<SessionAuthority<C>, WardenError> {
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(TokioClock::try_current().ok_or(WardenError::NoRuntime)?),
        };
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(TracingNavigator));

        let store = TokenStore::with_keys(storage, self.keys);
        let guard = RouteGuard::new(store.clone(), Arc::clone(&clock));
        let controller = SessionController::new(
            store.clone(),
            ExpiryScheduler::new(clock, self.scheduler_config),
            confirmer,
            navigator,
            self.session_config,
        );

        tracing::debug!(keys = ?store.keys(), "session authority built");
        Ok(SessionAuthority {
            store,
            guard,
            controller,
        })
    }
}

impl Default for SessionAuthorityBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One application's view of its session.
///
/// Cheap to clone; clones share the credential and the controller.
pub struct SessionAuthority<C = NoConfirmation> {
    store: TokenStore,
    guard: RouteGuard,
    controller: SessionController<C>,
}

impl<C> Clone for SessionAuthority<C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            guard: self.guard.clone(),
            controller: self.controller.clone(),
        }
    }
}

impl SessionAuthority {
    pub fn builder() -> SessionAuthorityBuilder {
        SessionAuthorityBuilder::new()
    }
}

impl<C: IdentityConfirmer> SessionAuthority<C> {
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    pub fn controller(&self) -> &SessionController<C> {
        &self.controller
    }

    /// Persists a fresh credential from a login response.
    pub fn login(&self, grant: &LoginGrant) -> Result<(), WardenError> {
        self.store.persist_login(grant)?;
        Ok(())
    }

    /// Claims of the stored token, without validating expiry.
    ///
    /// Returns `Ok(None)` when nothing is stored.
    pub fn claims(&self) -> Result<Option<Claims>, WardenError> {
        match self.store.get() {
            Some(token) => Ok(Some(decode(&token)?)),
            None => Ok(None),
        }
    }

    pub fn authorize(&self, required_role: Option<&str>) -> Authorization {
        self.guard.authorize(required_role)
    }

    pub fn resolve(&self, table: &RouteTable, path: &str) -> RouteDecision {
        self.guard.resolve(table, path)
    }

    pub fn session(&self) -> SessionSnapshot {
        self.guard.session()
    }

    pub async fn activate(&self) -> LifecycleState {
        self.controller.activate().await
    }

    pub fn deactivate(&self) {
        self.controller.deactivate();
    }

    pub fn logout(&self) -> LifecycleState {
        self.controller.logout()
    }

    pub fn state(&self) -> LifecycleState {
        self.controller.state()
    }
}

impl<C> std::fmt::Debug for SessionAuthority<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAuthority")
            .field("store", &self.store)
            .field("controller", &self.controller)
            .finish()
    }
}
