//! tbnco - Network reconciliation controller
//!
//! Runs the controller against the cluster from the ambient kubeconfig, or
//! handles one of the offline subcommands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tbnco::cli::{self, ConfigSubcommand};
use tbnco::config::ConfigLoader;
use tbnco::controller::{self, Noop};

/// tbnco - reconciles Network custom resources
#[derive(Parser, Debug)]
#[command(name = "tbnco")]
#[command(
    about = "A Kubernetes controller reconciling Network custom resources",
    long_about = None
)]
struct Args {
    /// Enable debug logging
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Main commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Run the controller (default)
    Run,
    /// Print the Network CustomResourceDefinition
    Crd,
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run(args.config, args.debug).await,
        Command::Crd => cli::print_crd(),
        Command::Config { subcommand } => {
            cli::handle_config_command(subcommand, args.config.as_deref())
        }
        Command::Version => {
            cli::display_version();
            Ok(())
        }
    }
}

async fn run(config_path: Option<PathBuf>, debug: bool) -> Result<()> {
    let config = ConfigLoader::load_validated(config_path.as_deref())
        .context("Failed to load configuration")?;
    cli::init_logging(&config.logger, debug)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting tbnco");

    let client = tbnco::cluster::create_client().await?;
    controller::run(
        client,
        config.runtime_options(),
        Arc::new(Noop),
        Arc::new(Noop),
    )
    .await
    .context("Controller failed")?;

    Ok(())
}
