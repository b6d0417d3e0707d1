//! Concurrent in-memory session registry.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;
use tracing::debug;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_core::types::SessionId;

use crate::model::Session;

/// Registry of live sessions keyed by handle.
///
/// Every operation locks only the shard holding the key, so lookups on
/// unrelated sessions never contend. Operations on the same handle are
/// linearizable: a `get` after `revoke` always fails, and eviction through
/// [`evict_if_idle`](Self::evict_if_idle) re-checks idleness under the same
/// lock a concurrent `get` takes to refresh it.
pub struct SessionStore<U> {
    sessions: DashMap<SessionId, Session<U>>,
}

impl<U> SessionStore<U> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Registers a new session for `owner` and returns it.
    ///
    /// # Panics
    ///
    /// Panics if the freshly generated handle is already registered. With
    /// 122 random bits per handle this means the random source is broken.
    pub fn create(&self, owner: U) -> Session<U> {
        self.insert(SessionId::new(), Arc::new(owner))
    }

    fn insert(&self, id: SessionId, owner: Arc<U>) -> Session<U> {
        match self.sessions.entry(id) {
            Entry::Occupied(_) => panic!("session id collision on {}", id.redacted()),
            Entry::Vacant(slot) => {
                let session = Session::new(id, owner, Instant::now());
                slot.insert(session.clone());
                debug!(session_id = %id.redacted(), "Session created");
                session
            }
        }
    }

    /// Looks up a live session and refreshes its idle clock.
    ///
    /// Fails with [`AccessDenied`](gatehouse_core::ErrorKind::AccessDenied)
    /// when the handle is not registered, whatever the reason.
    pub fn get(&self, id: &SessionId) -> AppResult<Session<U>> {
        match self.sessions.get_mut(id) {
            Some(mut entry) => {
                entry.touch(Instant::now());
                Ok(entry.clone())
            }
            None => Err(AppError::access_denied()),
        }
    }

    /// Same as [`get`](Self::get) for a client-supplied token string.
    ///
    /// A malformed token is rejected exactly like an unknown one.
    pub fn get_by_token(&self, token: &str) -> AppResult<Session<U>> {
        let id: SessionId = token.parse().map_err(|_| AppError::access_denied())?;
        self.get(&id)
    }

    /// Removes a session. Returns whether anything was removed.
    ///
    /// Revoking an unknown handle is a no-op.
    pub fn revoke(&self, id: &SessionId) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            debug!(session_id = %id.redacted(), "Session revoked");
        }
        removed
    }

    /// Removes the session only if it was last accessed before `cutoff`.
    ///
    /// The check and the removal happen under one shard lock, so a session
    /// refreshed by a concurrent [`get`](Self::get) is kept.
    pub fn evict_if_idle(&self, id: &SessionId, cutoff: Instant) -> Option<Session<U>> {
        self.sessions
            .remove_if(id, |_, session| session.is_idle_since(cutoff))
            .map(|(_, session)| session)
    }

    /// Whether a handle is registered. Does not refresh the session.
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Copies every live session.
    ///
    /// Concurrent create, get, and revoke calls proceed while the copy is
    /// taken; the copy may or may not include their effects.
    pub fn snapshot(&self) -> Vec<Session<U>> {
        self.sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl<U> Default for SessionStore<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> std::fmt::Debug for SessionStore<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.sessions.len())
            .finish()
    }
}
