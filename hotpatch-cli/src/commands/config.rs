//! Configuration management CLI commands.
//!
//! Provides `config get`, `config set`, `config list`, `config path` and
//! `config patch` for viewing and modifying settings from the command line.

use std::path::Path;

use clap::Subcommand;
use hotpatch::config::{ConfigFile, ConfigKey};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., server.check_url)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., server.check_url)
        key: String,

        /// Value to set
        value: String,
    },

    /// Record the locally installed hash for a business
    Patch {
        /// Business id
        business_id: String,

        /// Installed hash; omit to remove the entry
        hash: Option<String>,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand against the file at `path`.
pub fn run(command: ConfigCommands, path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => run_get(path, &key),
        ConfigCommands::Set { key, value } => run_set(path, &key, &value),
        ConfigCommands::Patch { business_id, hash } => run_patch(path, &business_id, hash),
        ConfigCommands::List => run_list(path),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'hotpatch config list' to see available keys.",
            key
        ))
    })
}

fn run_get(path: &Path, key: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let config = ConfigFile::load_from(path)?;
    let value = config_key.get(&config);

    if value.is_empty() {
        println!("(not set)");
    } else {
        println!("{}", value);
    }
    Ok(())
}

fn run_set(path: &Path, key: &str, value: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let mut config = ConfigFile::load_from(path)?;
    config_key.set(&mut config, value)?;
    config.save_to(path)?;

    println!("Set {} = {}", config_key.name(), value);
    Ok(())
}

fn run_patch(path: &Path, business_id: &str, hash: Option<String>) -> Result<(), CliError> {
    let business_id = business_id.trim();
    if business_id.is_empty() {
        return Err(CliError::Config("Business id cannot be empty".to_string()));
    }

    let mut config = ConfigFile::load_from(path)?;
    match hash {
        Some(hash) => {
            println!("Set patches.{} = {}", business_id, hash);
            config.patches.insert(business_id.to_string(), hash);
        }
        None => {
            if config.patches.remove(business_id).is_none() {
                println!("No patch recorded for {}", business_id);
                return Ok(());
            }
            println!("Removed patches.{}", business_id);
        }
    }
    config.save_to(path)?;
    Ok(())
}

fn run_list(path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(path)?;

    println!("Configuration Settings");
    println!("======================");
    println!();

    let mut current_section = "";
    for key in ConfigKey::all() {
        let section = key.section();
        if section != current_section {
            if !current_section.is_empty() {
                println!();
            }
            println!("[{}]", section);
            current_section = section;
        }

        let value = key.get(&config);
        if value.is_empty() {
            println!("  {} = (not set)", key.key_name());
        } else {
            println!("  {} = {}", key.key_name(), value);
        }
    }

    println!();
    println!("[patches]");
    if config.patches.is_empty() {
        println!("  (none)");
    }
    for (id, hash) in &config.patches {
        println!("  {} = {}", id, hash);
    }

    Ok(())
}
