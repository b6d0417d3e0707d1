//! Periodic eviction of idle sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use gatehouse_core::config::SessionConfig;

use crate::listener::SessionListener;
use crate::model::Session;
use crate::store::SessionStore;

/// How long [`SweeperHandle::stop`] waits for the loop before aborting it.
const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of a single sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Sessions present in the snapshot.
    pub scanned: usize,
    /// Snapshot entries idle past the cutoff.
    pub candidates: usize,
    /// Sessions actually removed (candidates minus those refreshed or revoked meanwhile).
    pub evicted: usize,
    /// Listener calls that returned an error or panicked.
    pub listener_failures: usize,
}

/// Evicts sessions whose last access is older than the configured timeout.
pub struct TimeoutSweeper<U: Send + Sync + 'static> {
    /// Store being swept.
    store: Arc<SessionStore<U>>,
    /// Idle timeout; `None` disables eviction.
    timeout: Option<Duration>,
    /// Pause between passes.
    interval: Duration,
    /// Hooks notified for every evicted session.
    listeners: Vec<Arc<dyn SessionListener<U>>>,
}

impl<U: Send + Sync + 'static> std::fmt::Debug for TimeoutSweeper<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutSweeper")
            .field("timeout", &self.timeout)
            .field("interval", &self.interval)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<U: Send + Sync + 'static> TimeoutSweeper<U> {
    /// Creates a sweeper for `store` using the timeout and interval from `config`.
    pub fn new(store: Arc<SessionStore<U>>, config: &SessionConfig) -> Self {
        Self {
            store,
            timeout: config.timeout(),
            interval: config.sweep_interval(),
            listeners: Vec::new(),
        }
    }

    /// Adds a listener notified for every expired session.
    pub fn with_listener(mut self, listener: Arc<dyn SessionListener<U>>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Idle timeout, or `None` when expiration is disabled.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Runs one pass against the current time.
    pub async fn run_pass(&self) -> SweepReport {
        self.run_pass_at(Instant::now()).await
    }

    /// Runs one pass as if the current time were `now`.
    ///
    /// Works on a copy of the store, so concurrent callers are never
    /// blocked for the length of the scan. Each candidate is re-checked at
    /// removal time; a session refreshed since the copy was taken stays.
    pub async fn run_pass_at(&self, now: Instant) -> SweepReport {
        let mut report = SweepReport::default();

        let Some(timeout) = self.timeout else {
            return report;
        };

        let snapshot = self.store.snapshot();
        report.scanned = snapshot.len();

        // Nothing can be older than the clock's origin.
        let Some(cutoff) = now.checked_sub(timeout) else {
            return report;
        };

        for session in snapshot.iter().filter(|s| s.is_idle_since(cutoff)) {
            report.candidates += 1;

            let Some(evicted) = self.store.evict_if_idle(&session.id(), cutoff) else {
                debug!(
                    session_id = %session.id().redacted(),
                    "Session refreshed or revoked during sweep, kept"
                );
                continue;
            };

            report.evicted += 1;
            debug!(
                session_id = %evicted.id().redacted(),
                idle_seconds = evicted.idle_for(now).as_secs(),
                "Idle session expired"
            );

            self.notify_listeners(&evicted, &mut report).await;
        }

        if report.evicted > 0 || report.listener_failures > 0 {
            info!(
                scanned = report.scanned,
                evicted = report.evicted,
                listener_failures = report.listener_failures,
                "Session sweep completed"
            );
        }

        report
    }

    /// Hands an evicted session to every listener.
    ///
    /// Each call runs in its own task, so a listener that panics is counted
    /// as a failure like one that returns an error, and the pass goes on.
    async fn notify_listeners(&self, evicted: &Session<U>, report: &mut SweepReport) {
        for listener in &self.listeners {
            let task = {
                let listener = Arc::clone(listener);
                let session = evicted.clone();
                tokio::spawn(async move { listener.on_expired(&session).await })
            };

            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    report.listener_failures += 1;
                    error!(
                        session_id = %evicted.id().redacted(),
                        listener = listener.name(),
                        error = %e,
                        "Session listener failed on expiry"
                    );
                }
                Err(e) => {
                    report.listener_failures += 1;
                    error!(
                        session_id = %evicted.id().redacted(),
                        listener = listener.name(),
                        error = %e,
                        "Session listener panicked on expiry"
                    );
                }
            }
        }
    }

    /// Runs passes until `cancel` turns `true` or its sender goes away.
    ///
    /// The pause between passes is interrupted by the cancel signal.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(
            timeout_minutes = self.timeout.map(|t| t.as_secs() / 60).unwrap_or(0),
            interval_seconds = self.interval.as_secs(),
            "Session sweeper started"
        );

        loop {
            if *cancel.borrow_and_update() {
                break;
            }

            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = time::sleep(self.interval) => {
                    self.run_pass().await;
                }
            }
        }

        info!("Session sweeper stopped");
    }

    /// Spawns [`run`](Self::run) on the current Tokio runtime.
    pub fn start(self: Arc<Self>) -> SweeperHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            self.run(shutdown_rx).await;
        });

        SweeperHandle { shutdown_tx, task }
    }
}

/// Handle to a running sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signals the loop to stop and waits for it to exit.
    ///
    /// The loop is aborted if it has not exited within a bounded delay,
    /// e.g. because a listener is stuck.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);

        let mut task = self.task;
        match time::timeout(STOP_TIMEOUT, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Session sweeper task failed"),
            Err(_) => {
                warn!(
                    timeout_seconds = STOP_TIMEOUT.as_secs(),
                    "Session sweeper did not stop in time, aborting"
                );
                task.abort();
            }
        }
    }

    /// Whether the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
