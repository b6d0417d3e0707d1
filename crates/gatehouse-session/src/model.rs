//! Session record.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use gatehouse_core::types::SessionId;

/// A live binding between an opaque handle and an authenticated owner.
///
/// Values returned by the store are snapshots: the authoritative record
/// stays inside [`SessionStore`](crate::SessionStore), and only the store
/// moves `last_access` forward.
pub struct Session<U> {
    /// Handle given to the client.
    id: SessionId,
    /// Authenticated actor. Never inspected by the store.
    owner: Arc<U>,
    /// Wall-clock creation time, for display and auditing.
    created_at: DateTime<Utc>,
    /// Monotonic time of the last successful lookup.
    last_access: Instant,
}

impl<U> Session<U> {
    pub(crate) fn new(id: SessionId, owner: Arc<U>, now: Instant) -> Self {
        Self {
            id,
            owner,
            created_at: Utc::now(),
            last_access: now,
        }
    }

    /// The session handle.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The owner this session was created for.
    pub fn owner(&self) -> &U {
        &self.owner
    }

    /// When the session was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the session was last looked up.
    pub fn last_access(&self) -> Instant {
        self.last_access
    }

    /// How long the session has been idle as of `now`.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_access)
    }

    /// Whether the last access happened strictly before `cutoff`.
    pub fn is_idle_since(&self, cutoff: Instant) -> bool {
        self.last_access < cutoff
    }

    /// Moves the idle clock forward. Never moves it back.
    pub(crate) fn touch(&mut self, now: Instant) {
        if now > self.last_access {
            self.last_access = now;
        }
    }
}

impl<U> Clone for Session<U> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            owner: Arc::clone(&self.owner),
            created_at: self.created_at,
            last_access: self.last_access,
        }
    }
}

impl<U> fmt::Debug for Session<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id.redacted())
            .field("created_at", &self.created_at)
            .field("last_access", &self.last_access)
            .finish_non_exhaustive()
    }
}
