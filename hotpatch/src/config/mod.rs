//! INI configuration file.
//!
//! Loaded from `~/.config/hotpatch/config.ini` by default. A missing file
//! yields defaults; missing keys fall back to their default values.
//!
//! ```text
//! [server]
//! check_url = https://patches.example.com/check
//! timeout_secs = 30
//!
//! [downloads]
//! directory = /var/tmp/hotpatch
//! max_concurrent = 4
//!
//! [logging]
//! level = info
//! directory = /var/log/hotpatch
//!
//! [patches]
//! home = 3f2a...
//! ```
//!
//! The `[patches]` section maps business ids to locally installed hashes and
//! seeds the in-memory patch registry.

mod keys;

pub use keys::{ConfigKey, ConfigKeyError};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::executor::ExecutorConfig;
use crate::registry::InMemoryPatchRegistry;

/// Default HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default download concurrency cap.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const SECTION_SERVER: &str = "server";
const SECTION_DOWNLOADS: &str = "downloads";
const SECTION_LOGGING: &str = "logging";
const SECTION_PATCHES: &str = "patches";

/// Errors loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value '{value}' for {section}.{key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// `[server]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Check-for-update endpoint. Unset means no check can be performed.
    pub check_url: Option<String>,
    /// HTTP timeout applied to check and download requests.
    pub timeout: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            check_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// `[downloads]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    /// Where downloaded patches are written.
    pub directory: PathBuf,
    /// Maximum downloads running at once.
    pub max_concurrent: usize,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            directory: default_download_dir(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

impl DownloadSettings {
    /// Executor configuration for these settings.
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::with_max_concurrent(self.max_concurrent)
    }
}

/// `[logging]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Directory for daily log files; stderr only when unset.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            directory: None,
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub server: ServerSettings,
    pub downloads: DownloadSettings,
    pub logging: LoggingConfig,
    /// Business id → locally installed hash.
    pub patches: BTreeMap<String, String>,
}

impl ConfigFile {
    /// Load from the default location, or defaults if the file is absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from a specific path, or defaults if the file is absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini(&ini)
    }

    /// Parse from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<string>"),
            source: ini::Error::Parse(e),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some(SECTION_SERVER)) {
            if let Some(url) = non_empty(section.get("check_url")) {
                config.server.check_url = Some(url.to_string());
            }
            if let Some(secs) = non_empty(section.get("timeout_secs")) {
                let secs: u64 = parse_number(SECTION_SERVER, "timeout_secs", secs)?;
                config.server.timeout = Duration::from_secs(secs);
            }
        }

        if let Some(section) = ini.section(Some(SECTION_DOWNLOADS)) {
            if let Some(dir) = non_empty(section.get("directory")) {
                config.downloads.directory = expand_tilde(dir);
            }
            if let Some(max) = non_empty(section.get("max_concurrent")) {
                let max: usize = parse_number(SECTION_DOWNLOADS, "max_concurrent", max)?;
                if max == 0 {
                    return Err(ConfigError::InvalidValue {
                        section: SECTION_DOWNLOADS.to_string(),
                        key: "max_concurrent".to_string(),
                        value: max.to_string(),
                        reason: "must be at least 1".to_string(),
                    });
                }
                config.downloads.max_concurrent = max;
            }
        }

        if let Some(section) = ini.section(Some(SECTION_LOGGING)) {
            if let Some(level) = non_empty(section.get("level")) {
                config.logging.level = level.to_string();
            }
            if let Some(dir) = non_empty(section.get("directory")) {
                config.logging.directory = Some(expand_tilde(dir));
            }
        }

        if let Some(section) = ini.section(Some(SECTION_PATCHES)) {
            for (id, hash) in section.iter() {
                let id = id.trim();
                if !id.is_empty() {
                    config.patches.insert(id.to_string(), hash.trim().to_string());
                }
            }
        }

        Ok(config)
    }

    /// Save to the default location, creating the directory if needed.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to a specific path, creating the parent directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        self.to_ini().write_to_file(path).map_err(write_err)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();

        let mut server = ini.with_section(Some(SECTION_SERVER));
        if let Some(url) = &self.server.check_url {
            server.set("check_url", url.as_str());
        }
        server.set("timeout_secs", self.server.timeout.as_secs().to_string());

        ini.with_section(Some(SECTION_DOWNLOADS))
            .set("directory", self.downloads.directory.display().to_string())
            .set("max_concurrent", self.downloads.max_concurrent.to_string());

        let mut logging = ini.with_section(Some(SECTION_LOGGING));
        logging.set("level", self.logging.level.as_str());
        if let Some(dir) = &self.logging.directory {
            logging.set("directory", dir.display().to_string());
        }

        let mut patches = ini.with_section(Some(SECTION_PATCHES));
        for (id, hash) in &self.patches {
            patches.set(id.as_str(), hash.as_str());
        }

        ini
    }

    /// Build a patch registry seeded from `[patches]`.
    pub fn patch_registry(&self) -> InMemoryPatchRegistry {
        InMemoryPatchRegistry::from_local(
            self.patches
                .iter()
                .map(|(id, hash)| (id.clone(), hash.clone())),
        )
    }
}

/// Configuration directory (`~/.config/hotpatch`).
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hotpatch")
}

/// Default configuration file path.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// Default download directory (`~/.cache/hotpatch/downloads`).
pub fn default_download_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("hotpatch")
        .join("downloads")
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(
    section: &str,
    key: &str,
    value: &str,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
