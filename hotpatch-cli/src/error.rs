//! CLI error type.

use std::fmt;

use hotpatch::config::{ConfigError, ConfigKeyError};
use hotpatch::executor::ExecutorError;
use hotpatch::logging::LoggingError;
use hotpatch::transport::TransportError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration missing or invalid.
    Config(String),
    /// Logging could not be set up.
    Logging(String),
    /// Runtime or executor setup failed.
    Runtime(String),
    /// A transport could not be created.
    Transport(String),
    /// The check for updates failed.
    CheckFailed(String),
    /// One or more downloads failed.
    DownloadsFailed(usize),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(msg) => write!(f, "Logging error: {}", msg),
            CliError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
            CliError::Transport(msg) => write!(f, "Transport error: {}", msg),
            CliError::CheckFailed(msg) => write!(f, "Check for update failed: {}", msg),
            CliError::DownloadsFailed(count) => {
                write!(f, "{} patch download(s) failed", count)
            }
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<ConfigKeyError> for CliError {
    fn from(e: ConfigKeyError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e.to_string())
    }
}

impl From<ExecutorError> for CliError {
    fn from(e: ExecutorError) -> Self {
        CliError::Runtime(e.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Runtime(e.to_string())
    }
}

impl From<TransportError> for CliError {
    fn from(e: TransportError) -> Self {
        CliError::Transport(e.to_string())
    }
}
