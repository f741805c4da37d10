//! Configuration system for tbnco
//!
//! Layered configuration: built-in defaults, an optional YAML file and
//! `TBNCO_*` environment overrides.

mod defaults;
pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{Config, LoggerConfig, RequeueConfig};

/// Get a configuration value by key (dot notation)
pub fn get_config_value(config: &Config, key: &str) -> anyhow::Result<String> {
    match key {
        "watchNamespace" => Ok(config.watch_namespace.clone().unwrap_or_default()),
        "namespaceSelector" => match &config.namespace_selector {
            Some(selector) => serde_yaml::to_string(selector)
                .map_err(|e| anyhow::anyhow!("Failed to serialize namespaceSelector: {}", e)),
            None => Ok(String::new()),
        },
        "concurrency" => Ok(config.concurrency.to_string()),
        "requeue.errorBackoffSeconds" => Ok(config.requeue.error_backoff_seconds.to_string()),
        "requeue.progressIntervalSeconds" => {
            Ok(config.requeue.progress_interval_seconds.to_string())
        }
        "capabilityTimeoutSeconds" => Ok(config.capability_timeout_seconds.to_string()),
        "logger.level" => Ok(config.logger.level.clone()),
        "logger.ansi" => Ok(config.logger.ansi.to_string()),
        _ => Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }
}
