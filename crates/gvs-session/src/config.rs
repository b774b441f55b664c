use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Session configuration.
///
/// Missing keys take their default; unknown keys are rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Buffered notifications per subscriber before the slowest one lags.
    pub notification_capacity: usize,
    /// Re-check status when a document is saved.
    pub refresh_on_save: bool,
    /// Re-check status when the application regains focus.
    pub refresh_on_activate: bool,
    /// Re-sync period of `gvs watch`, in milliseconds.
    pub watch_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            notification_capacity: 64,
            refresh_on_save: true,
            refresh_on_activate: true,
            watch_interval_ms: 2000,
        }
    }
}

impl SessionConfig {
    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.notification_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "notification_capacity",
                reason: "must be at least 1".into(),
            });
        }
        if self.watch_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "watch_interval_ms",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = SessionConfig::default();
        assert_eq!(c.notification_capacity, 64);
        assert!(c.refresh_on_save);
        assert!(c.refresh_on_activate);
        assert_eq!(c.watch_interval(), Duration::from_secs(2));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn missing_keys_take_defaults() {
        let c = SessionConfig::from_toml("refresh_on_save = false\n").unwrap();
        assert!(!c.refresh_on_save);
        assert_eq!(c.notification_capacity, 64);
        assert_eq!(SessionConfig::from_toml("").unwrap(), SessionConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = SessionConfig::from_toml("refresh_on_blur = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_capacity_is_invalid() {
        let err = SessionConfig::from_toml("notification_capacity = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "notification_capacity",
                ..
            }
        ));
    }

    #[test]
    fn toml_round_trip() {
        let c = SessionConfig {
            watch_interval_ms: 500,
            ..SessionConfig::default()
        };
        let text = c.to_toml().unwrap();
        assert_eq!(SessionConfig::from_toml(&text).unwrap(), c);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gvs.toml");
        fs::write(&path, "watch_interval_ms = 250\nrefresh_on_activate = false\n").unwrap();
        let c = SessionConfig::load(&path).unwrap();
        assert_eq!(c.watch_interval_ms, 250);
        assert!(!c.refresh_on_activate);

        let missing = SessionConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
