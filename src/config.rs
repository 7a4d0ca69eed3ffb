//! Tool configuration
//!
//! Read from `~/.config/gateway-jobs/config.toml` or an explicit path:
//!
//! ```toml
//! [ssh]
//! user = "tapis"
//! key_path = "~/.ssh/id_ed25519"
//! command_timeout_seconds = 120
//!
//! [monitor]
//! max_elapsed_seconds = 86400
//!
//! [[monitor.step]]
//! interval_seconds = 5
//! until_seconds = 300
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::monitor::{MonitorPolicy, PolicyConfig, PolicyValidationError};
use crate::remote::SshConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ssh: SshConfig,
    pub monitor: PolicyConfig,
}

/// Errors loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("HOME environment variable not set")]
    NoHome,

    #[error("[ssh] {field} must be greater than 0")]
    ZeroSshSetting { field: &'static str },

    #[error("[ssh] user must not be blank")]
    BlankSshUser,

    #[error("[monitor] {0}")]
    Monitor(#[from] PolicyValidationError),
}

impl Config {
    /// Default location (`~/.config/gateway-jobs/config.toml`)
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = std::env::var("HOME").map_err(|_| ConfigError::NoHome)?;
        Ok(PathBuf::from(home).join(".config/gateway-jobs/config.toml"))
    }

    /// Load from the default location; built-in defaults when there is no file.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// Load from an explicit path, which must exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// `--config` if given, else the default location.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None => Self::load_default(),
        }
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ssh = &self.ssh;
        let zero = [
            ("connect_timeout_seconds", ssh.connect_timeout_seconds == 0),
            ("command_timeout_seconds", ssh.command_timeout_seconds == 0),
            ("server_alive_interval", ssh.server_alive_interval == 0),
            ("server_alive_count_max", ssh.server_alive_count_max == 0),
        ];
        if let Some((field, _)) = zero.into_iter().find(|(_, is_zero)| *is_zero) {
            return Err(ConfigError::ZeroSshSetting { field });
        }
        if ssh.user.trim().is_empty() {
            return Err(ConfigError::BlankSshUser);
        }

        self.monitor.validate()?;
        Ok(())
    }

    pub fn policy(&self) -> MonitorPolicy {
        MonitorPolicy::new(&self.monitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.ssh.user, "tapis");
        assert_eq!(config.ssh.command_timeout_seconds, 120);
        assert_eq!(config.monitor, PolicyConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let config = Config::parse(
            r#"
            [ssh]
            user = "svc"
            command_timeout_seconds = 30

            [monitor]
            max_attempts = 50

            [[monitor.step]]
            interval_seconds = 2
            until_seconds = 120
            "#,
        )
        .unwrap();
        assert_eq!(config.ssh.user, "svc");
        assert_eq!(config.ssh.connect_timeout_seconds, 30);
        assert_eq!(config.monitor.max_attempts, Some(50));
        assert_eq!(config.monitor.steps.len(), 1);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = Config::parse("[ssh]\ncommand_timeout_seconds = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ZeroSshSetting { field: "command_timeout_seconds" }
        ));
    }

    #[test]
    fn test_bad_steps_rejected() {
        let err = Config::parse(
            r#"
            [[monitor.step]]
            interval_seconds = 5
            until_seconds = 60

            [[monitor.step]]
            interval_seconds = 10
            until_seconds = 30
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Monitor(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[ssh]\nuser = \"svc\"").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.ssh.user, "svc");
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::resolve(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
