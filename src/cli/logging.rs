//! Logging initialization

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::config::LoggerConfig;

/// Pick the filter directive
///
/// `RUST_LOG` wins, then `--debug`, then the configured level.
fn filter_directive(config: &LoggerConfig, debug: bool, rust_log: Option<String>) -> String {
    match rust_log.filter(|v| !v.is_empty()) {
        Some(directive) => directive,
        None if debug => "debug".to_string(),
        None => config.level.clone(),
    }
}

/// Initialize logging to stderr
pub fn init_logging(config: &LoggerConfig, debug: bool) -> Result<()> {
    let directive = filter_directive(config, debug, std::env::var("RUST_LOG").ok());
    let filter = EnvFilter::try_new(&directive)
        .map_err(|e| anyhow::anyhow!("Invalid log filter '{}': {}", directive, e))?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
