//! Config command handlers

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::config::{ConfigLoader, paths};

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigSubcommand {
    /// Print the effective configuration
    Show,
    /// Get configuration value
    Get {
        /// Configuration key (e.g., "concurrency", "requeue.errorBackoffSeconds")
        key: String,
    },
    /// Show configuration file path
    Path,
    /// Validate configuration
    Validate,
}

/// Handle configuration subcommands
///
/// `path` is the file given with `--config`, if any.
pub fn handle_config_command(cmd: ConfigSubcommand, path: Option<&Path>) -> Result<()> {
    match cmd {
        ConfigSubcommand::Show => {
            let config = ConfigLoader::load(path).context("Failed to load configuration")?;
            let yaml =
                serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
            print!("{}", yaml);
        }
        ConfigSubcommand::Get { key } => {
            let config = ConfigLoader::load(path).context("Failed to load configuration")?;
            let value = crate::config::get_config_value(&config, &key)?;
            println!("{}", value);
        }
        ConfigSubcommand::Path => {
            let config_path = path
                .map(Path::to_path_buf)
                .unwrap_or_else(paths::root_config_path);
            println!("{}", config_path.display());
        }
        ConfigSubcommand::Validate => match ConfigLoader::load_validated(path) {
            Ok(_) => {
                println!("Configuration is valid");
            }
            Err(e) => {
                eprintln!("Configuration validation failed: {:#}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
