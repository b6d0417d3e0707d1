//! End-to-end expiration scenarios driven through the session manager.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use gatehouse_core::ErrorKind;
use gatehouse_core::config::{AppConfig, SessionConfig};
use gatehouse_core::result::AppResult;
use gatehouse_session::{Session, SessionListener, SessionManager};

/// Authenticated actor handed to the registry by the login path.
#[derive(Debug)]
struct Principal {
    username: String,
}

fn principal(name: &str) -> Principal {
    Principal {
        username: name.to_string(),
    }
}

fn manager(timeout_minutes: u64) -> SessionManager<Principal> {
    SessionManager::new(SessionConfig {
        timeout_minutes,
        sweep_interval_seconds: 60,
    })
    .expect("valid config")
}

#[derive(Default)]
struct ExpiryLog {
    expired: AtomicUsize,
}

#[async_trait]
impl SessionListener<Principal> for ExpiryLog {
    fn name(&self) -> &str {
        "expiry-log"
    }

    async fn on_expired(&self, _session: &Session<Principal>) -> AppResult<()> {
        self.expired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_unused_session_expires_after_timeout() {
    let manager = manager(1);
    let session = manager.create(principal("alice"));
    assert_eq!(manager.get(&session.id()).expect("live").owner().username, "alice");

    tokio::time::advance(Duration::from_secs(120)).await;
    manager.sweep_now().await;

    let err = manager.get(&session.id()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);
}

#[tokio::test(start_paused = true)]
async fn test_access_within_window_keeps_session() {
    let manager = manager(1);
    let session = manager.create(principal("alice"));
    manager.get(&session.id()).expect("t=0:00");

    tokio::time::advance(Duration::from_secs(45)).await;
    manager.get(&session.id()).expect("t=0:45");

    tokio::time::advance(Duration::from_secs(15)).await;
    let report = manager.sweep_now().await;
    assert_eq!(report.evicted, 0);

    tokio::time::advance(Duration::from_secs(30)).await;
    assert!(manager.get(&session.id()).is_ok(), "t=1:30");
}

#[tokio::test(start_paused = true)]
async fn test_background_sweeper_expires_and_notifies() {
    let log = Arc::new(ExpiryLog::default());
    let manager =
        manager(1).with_listener(Arc::clone(&log) as Arc<dyn SessionListener<Principal>>);
    manager.start().await;

    let idle = manager.create(principal("idle"));
    let busy = manager.create(principal("busy"));

    for _ in 0..6 {
        tokio::time::sleep(Duration::from_secs(30)).await;
        manager.get(&busy.id()).expect("busy session stays live");
    }

    assert!(manager.get(&idle.id()).unwrap_err().is_access_denied());
    assert_eq!(log.expired.load(Ordering::SeqCst), 1);
    assert_eq!(manager.store().len(), 1);

    manager.stop().await;
    assert!(!manager.is_running().await);
}

/// Listener whose release path crashes for one particular user.
struct CrashesOnMallory;

#[async_trait]
impl SessionListener<Principal> for CrashesOnMallory {
    fn name(&self) -> &str {
        "crashes-on-mallory"
    }

    async fn on_expired(&self, session: &Session<Principal>) -> AppResult<()> {
        if session.owner().username == "mallory" {
            panic!("release failed for mallory");
        }
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_panicking_listener_keeps_sweeper_running() {
    let log = Arc::new(ExpiryLog::default());
    let manager = manager(1)
        .with_listener(Arc::new(CrashesOnMallory))
        .with_listener(Arc::clone(&log) as Arc<dyn SessionListener<Principal>>);
    manager.start().await;

    let mallory = manager.create(principal("mallory"));
    tokio::time::sleep(Duration::from_secs(181)).await;

    assert!(manager.get(&mallory.id()).unwrap_err().is_access_denied());
    assert!(manager.is_running().await);

    let alice = manager.create(principal("alice"));
    tokio::time::sleep(Duration::from_secs(10 * 60)).await;

    assert!(manager.get(&alice.id()).unwrap_err().is_access_denied());
    assert!(manager.is_running().await);
    assert_eq!(log.expired.load(Ordering::SeqCst), 2);

    manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_disabled_timeout_keeps_sessions_forever() {
    let config = AppConfig::from_toml_str("[session]\ntimeout_minutes = 0\n").expect("config");
    let manager: SessionManager<Principal> =
        SessionManager::new(config.session).expect("valid config");
    manager.start().await;

    let session = manager.create(principal("alice"));
    tokio::time::sleep(Duration::from_secs(7 * 24 * 3600)).await;

    assert!(manager.get(&session.id()).is_ok());
    manager.stop().await;
}

#[tokio::test]
async fn test_logout_then_lookup_denied() {
    let manager = manager(30);
    let session = manager.create(principal("alice"));
    let token = session.id().to_string();

    assert!(manager.revoke(&session.id()));
    assert!(!manager.revoke(&session.id()));

    let err = manager.get_by_token(&token).unwrap_err();
    assert!(err.is_access_denied());
    assert!(manager.store().is_empty());
}
