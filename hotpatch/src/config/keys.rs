//! Addressable configuration keys (`section.key`) for get/set from the CLI.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use super::ConfigFile;

/// Errors parsing a key name or setting a value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigKeyError {
    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// A settable scalar in the configuration file.
///
/// `[patches]` entries are keyed by business id and are not listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ServerCheckUrl,
    ServerTimeoutSecs,
    DownloadsDirectory,
    DownloadsMaxConcurrent,
    LoggingLevel,
    LoggingDirectory,
}

impl ConfigKey {
    /// All keys in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::ServerCheckUrl,
            ConfigKey::ServerTimeoutSecs,
            ConfigKey::DownloadsDirectory,
            ConfigKey::DownloadsMaxConcurrent,
            ConfigKey::LoggingLevel,
            ConfigKey::LoggingDirectory,
        ]
    }

    /// INI section name.
    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::ServerCheckUrl | ConfigKey::ServerTimeoutSecs => "server",
            ConfigKey::DownloadsDirectory | ConfigKey::DownloadsMaxConcurrent => "downloads",
            ConfigKey::LoggingLevel | ConfigKey::LoggingDirectory => "logging",
        }
    }

    /// Key name within its section.
    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::ServerCheckUrl => "check_url",
            ConfigKey::ServerTimeoutSecs => "timeout_secs",
            ConfigKey::DownloadsDirectory => "directory",
            ConfigKey::DownloadsMaxConcurrent => "max_concurrent",
            ConfigKey::LoggingLevel => "level",
            ConfigKey::LoggingDirectory => "directory",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as text; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::ServerCheckUrl => config.server.check_url.clone().unwrap_or_default(),
            ConfigKey::ServerTimeoutSecs => config.server.timeout.as_secs().to_string(),
            ConfigKey::DownloadsDirectory => config.downloads.directory.display().to_string(),
            ConfigKey::DownloadsMaxConcurrent => config.downloads.max_concurrent.to_string(),
            ConfigKey::LoggingLevel => config.logging.level.clone(),
            ConfigKey::LoggingDirectory => config
                .logging
                .directory
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Set a value from text. An empty value clears optional keys.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigKeyError> {
        let value = value.trim();
        match self {
            ConfigKey::ServerCheckUrl => {
                config.server.check_url = (!value.is_empty()).then(|| value.to_string());
            }
            ConfigKey::ServerTimeoutSecs => {
                let secs: u64 = self.parse(value)?;
                config.server.timeout = Duration::from_secs(secs);
            }
            ConfigKey::DownloadsDirectory => {
                if value.is_empty() {
                    return Err(self.invalid(value, "directory cannot be empty"));
                }
                config.downloads.directory = PathBuf::from(value);
            }
            ConfigKey::DownloadsMaxConcurrent => {
                let max: usize = self.parse(value)?;
                if max == 0 {
                    return Err(self.invalid(value, "must be at least 1"));
                }
                config.downloads.max_concurrent = max;
            }
            ConfigKey::LoggingLevel => {
                if value.is_empty() {
                    return Err(self.invalid(value, "level cannot be empty"));
                }
                config.logging.level = value.to_string();
            }
            ConfigKey::LoggingDirectory => {
                config.logging.directory = (!value.is_empty()).then(|| PathBuf::from(value));
            }
        }
        Ok(())
    }

    fn parse<T>(&self, value: &str) -> Result<T, ConfigKeyError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        value
            .parse()
            .map_err(|e: T::Err| self.invalid(value, &e.to_string()))
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigKeyError {
        ConfigKeyError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigKeyError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
