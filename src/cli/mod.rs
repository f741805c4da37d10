//! CLI command handling module
//!
//! Handles all CLI subcommands and argument parsing.

mod config;
mod crd;
mod logging;
mod version;

pub use config::{ConfigSubcommand, handle_config_command};
pub use crd::{crd_yaml, print_crd};
pub use logging::*;
pub use version::display_version;
