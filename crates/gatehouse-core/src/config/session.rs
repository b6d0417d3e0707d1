//! Session management configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Session registry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle timeout in minutes. `0` disables passive expiration.
    ///
    /// Also read from `sessionTimeout` or `sessiontimeout` inside this table.
    /// A top-level `sessionTimeout` in any case is handled by
    /// [`AppConfig`](super::AppConfig) and applies when this key is unset.
    #[serde(
        default = "default_timeout",
        alias = "sessionTimeout",
        alias = "sessiontimeout"
    )]
    pub timeout_minutes: u64,
    /// Pause between two sweep passes, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl SessionConfig {
    /// Idle timeout as a duration, or `None` when expiration is disabled.
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_minutes {
            0 => None,
            minutes => Some(Duration::from_secs(minutes.saturating_mul(60))),
        }
    }

    /// Pause between two sweep passes.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    /// Rejects settings the sweeper cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.sweep_interval_seconds == 0 {
            return Err(AppError::validation(
                "session.sweep_interval_seconds must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: default_timeout(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

fn default_timeout() -> u64 {
    24 * 60
}

fn default_sweep_interval() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.timeout_minutes, 1440);
        assert_eq!(config.timeout(), Some(Duration::from_secs(86_400)));
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_disables_expiration() {
        let config = SessionConfig {
            timeout_minutes: 0,
            ..Default::default()
        };
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let config = SessionConfig {
            sweep_interval_seconds: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
    }

    #[test]
    fn test_legacy_key_accepted() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"sessionTimeout": 15}"#).expect("deserialize");
        assert_eq!(config.timeout_minutes, 15);
        assert_eq!(config.sweep_interval_seconds, 60);
    }
}
