//! Hooks notified when the sweeper expires a session.

use async_trait::async_trait;

use gatehouse_core::result::AppResult;

use crate::model::Session;

/// Receives sessions evicted for inactivity.
///
/// Typically used to release whatever was bound to the session when it was
/// created. Each call runs in its own task; an error or a panic is logged
/// by the sweeper and counted in the pass report, and never stops the pass
/// or reaches store callers.
#[async_trait]
pub trait SessionListener<U: Send + Sync>: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Called once for every session the sweeper removed.
    async fn on_expired(&self, session: &Session<U>) -> AppResult<()>;
}
