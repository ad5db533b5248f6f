//! Hotpatch CLI - check for and download business unit patches.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::style;
use hotpatch::config::{config_file_path, ConfigFile};
use hotpatch::logging::init_logging;

use commands::check::CheckArgs;
use commands::config::ConfigCommands;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "hotpatch", version, about = "Incremental patch updates per business unit")]
struct Cli {
    /// Configuration file (defaults to ~/.config/hotpatch/config.ini)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging for hotpatch
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check for newer patches and download them
    Check(CheckArgs),

    /// View or modify configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.unwrap_or_else(config_file_path);

    match cli.command {
        Commands::Config(command) => commands::config::run(command, &config_path),
        Commands::Check(args) => {
            let config = ConfigFile::load_from(&config_path)?;

            let mut logging = config.logging.clone();
            if cli.verbose {
                logging.level = "info,hotpatch=debug".to_string();
            }
            let _guard = init_logging(&logging)?;

            commands::check::run(args, config)
        }
    }
}
