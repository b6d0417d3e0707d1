//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod logging;
pub mod session;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use self::logging::LoggingConfig;
pub use self::session::SessionConfig;

use crate::error::AppError;

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "GATEHOUSE";

/// Top-level key older deployments use for the idle timeout, in minutes.
///
/// Matched without regard to case.
const LEGACY_TIMEOUT_KEY: &str = "sessionTimeout";

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Session registry settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config/default` with an environment-specific overlay
    /// `config/{env}` and environment variables prefixed with `GATEHOUSE`.
    /// Missing files are skipped.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        Self::finish(config)
    }

    /// Parse configuration from an in-memory TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        Self::finish(config)
    }

    fn finish(config: config::Config) -> Result<Self, AppError> {
        let legacy_timeout = Self::legacy_timeout(&config)?;
        let session_timeout_set = config.get::<config::Value>("session.timeout_minutes").is_ok();

        let mut app: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        if let Some(minutes) = legacy_timeout {
            if session_timeout_set {
                tracing::warn!(
                    key = LEGACY_TIMEOUT_KEY,
                    "Legacy timeout key ignored, session.timeout_minutes is set"
                );
            } else {
                app.session.timeout_minutes = minutes;
            }
        }

        app.session.validate()?;

        tracing::debug!(
            timeout_minutes = app.session.timeout_minutes,
            sweep_interval_seconds = app.session.sweep_interval_seconds,
            "Configuration resolved"
        );

        Ok(app)
    }

    /// Reads the top-level legacy timeout key, whatever its case.
    fn legacy_timeout(config: &config::Config) -> Result<Option<u64>, AppError> {
        let Some(value) = config
            .clone()
            .try_deserialize::<HashMap<String, config::Value>>()?
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(LEGACY_TIMEOUT_KEY))
            .map(|(_, value)| value)
        else {
            return Ok(None);
        };

        let minutes = value.into_int()?;
        u64::try_from(minutes).map(Some).map_err(|_| {
            AppError::validation(format!(
                "{LEGACY_TIMEOUT_KEY} must not be negative, got {minutes}"
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = AppConfig::from_toml_str("").expect("parse");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_session_section() {
        let config = AppConfig::from_toml_str(
            r#"
            [session]
            timeout_minutes = 0
            sweep_interval_seconds = 5

            [logging]
            format = "json"
            "#,
        )
        .expect("parse");

        assert_eq!(config.session.timeout(), None);
        assert_eq!(config.session.sweep_interval_seconds, 5);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_interval_fails_load() {
        let err = AppConfig::from_toml_str("[session]\nsweep_interval_seconds = 0\n").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
    }

    #[test]
    fn test_legacy_top_level_timeout() {
        let config = AppConfig::from_toml_str("sessionTimeout = 5\n").expect("parse");
        assert_eq!(config.session.timeout_minutes, 5);

        let config = AppConfig::from_toml_str("SESSIONTIMEOUT = 0\n").expect("parse");
        assert_eq!(config.session.timeout(), None);
    }

    #[test]
    fn test_session_section_beats_legacy_key() {
        let config = AppConfig::from_toml_str(
            r#"
            sessionTimeout = 5

            [session]
            timeout_minutes = 30
            "#,
        )
        .expect("parse");
        assert_eq!(config.session.timeout_minutes, 30);
    }

    #[test]
    fn test_negative_legacy_timeout_rejected() {
        let err = AppConfig::from_toml_str("sessionTimeout = -1\n").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
    }

    #[test]
    fn test_wrong_type_is_configuration_error() {
        let err = AppConfig::from_toml_str("[session]\ntimeout_minutes = \"soon\"\n").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
    }
}
