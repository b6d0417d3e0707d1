//! Session manager owning the registry and its background sweeper.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use gatehouse_core::config::SessionConfig;
use gatehouse_core::result::AppResult;
use gatehouse_core::types::SessionId;

use crate::listener::SessionListener;
use crate::model::Session;
use crate::store::SessionStore;
use crate::sweeper::{SweepReport, SweeperHandle, TimeoutSweeper};

/// Process-scoped entry point for session management.
///
/// Built once at startup and shared by reference with the authentication
/// path, the request dispatcher, and the logout path. [`start`](Self::start)
/// and [`stop`](Self::stop) bound the lifetime of the background sweeper.
pub struct SessionManager<U: Send + Sync + 'static> {
    /// Shared session registry.
    store: Arc<SessionStore<U>>,
    /// Resolved session configuration.
    config: SessionConfig,
    /// Listeners handed to every sweeper built by this manager.
    listeners: Vec<Arc<dyn SessionListener<U>>>,
    /// Running sweeper, if started.
    sweeper: Mutex<Option<SweeperHandle>>,
}

impl<U: Send + Sync + 'static> std::fmt::Debug for SessionManager<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<U: Send + Sync + 'static> SessionManager<U> {
    /// Creates a stopped manager with an empty store.
    pub fn new(config: SessionConfig) -> AppResult<Self> {
        config.validate()?;

        Ok(Self {
            store: Arc::new(SessionStore::new()),
            config,
            listeners: Vec::new(),
            sweeper: Mutex::new(None),
        })
    }

    /// Adds a listener notified when a session expires.
    ///
    /// Only affects sweepers started afterwards.
    pub fn with_listener(mut self, listener: Arc<dyn SessionListener<U>>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// The shared store.
    pub fn store(&self) -> &Arc<SessionStore<U>> {
        &self.store
    }

    /// The resolved configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// See [`SessionStore::create`].
    pub fn create(&self, owner: U) -> Session<U> {
        self.store.create(owner)
    }

    /// See [`SessionStore::get`].
    pub fn get(&self, id: &SessionId) -> AppResult<Session<U>> {
        self.store.get(id)
    }

    /// See [`SessionStore::get_by_token`].
    pub fn get_by_token(&self, token: &str) -> AppResult<Session<U>> {
        self.store.get_by_token(token)
    }

    /// See [`SessionStore::revoke`].
    pub fn revoke(&self, id: &SessionId) -> bool {
        self.store.revoke(id)
    }

    /// Runs one sweep pass immediately, independent of the background loop.
    pub async fn sweep_now(&self) -> SweepReport {
        self.build_sweeper().run_pass().await
    }

    /// Starts the background sweeper.
    ///
    /// Must be called from within a Tokio runtime. Starting a running
    /// manager is a caller error; it is logged and ignored.
    pub async fn start(&self) {
        let mut slot = self.sweeper.lock().await;
        if slot.is_some() {
            warn!("Session manager already running, start ignored");
            return;
        }

        *slot = Some(Arc::new(self.build_sweeper()).start());

        info!(
            timeout_minutes = self.config.timeout_minutes,
            sweep_interval_seconds = self.config.sweep_interval_seconds,
            "Session manager started"
        );
    }

    /// Stops the background sweeper and waits for it to exit.
    ///
    /// Live sessions stay in the store. Stopping a stopped manager does nothing.
    pub async fn stop(&self) {
        let handle = self.sweeper.lock().await.take();

        match handle {
            Some(handle) => {
                handle.stop().await;
                info!(sessions = self.store.len(), "Session manager stopped");
            }
            None => debug!("Session manager not running, stop ignored"),
        }
    }

    /// Whether the background sweeper is running.
    pub async fn is_running(&self) -> bool {
        self.sweeper
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn build_sweeper(&self) -> TimeoutSweeper<U> {
        self.listeners.iter().fold(
            TimeoutSweeper::new(Arc::clone(&self.store), &self.config),
            |sweeper, listener| sweeper.with_listener(Arc::clone(listener)),
        )
    }
}
