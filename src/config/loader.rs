//! Configuration loading and merging logic
//!
//! Handles loading configuration from multiple sources and merging them
//! according to precedence rules.

use super::{defaults, paths, schema::Config};
use anyhow::{Context, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::core::Selector;
use std::collections::BTreeMap;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with all layers merged
    ///
    /// Precedence order (highest to lowest):
    /// 1. Environment variable overrides
    /// 2. Config file (`path`, or the default location if it exists)
    /// 3. Built-in defaults
    ///
    /// An explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = Self::load_defaults();

        match path {
            Some(path) => {
                config = Self::merge_config(config, Self::load_file(path)?);
            }
            None => {
                let root = paths::root_config_path();
                if root.exists() {
                    config = Self::merge_config(config, Self::load_file(&root)?);
                }
            }
        }

        Self::apply_env_overrides(config, |key| std::env::var(key).ok())
    }

    /// Load configuration from a file
    pub fn load_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load the merged configuration and check its values
    pub fn load_validated(path: Option<&Path>) -> Result<Config> {
        let config = Self::load(path)?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Reject values the controller cannot run with
    pub fn validate(config: &Config) -> Result<()> {
        if config.requeue.error_backoff_seconds == 0 {
            return Err(anyhow::anyhow!("requeue.errorBackoffSeconds must be greater than 0"));
        }
        if config.requeue.progress_interval_seconds == 0 {
            return Err(anyhow::anyhow!(
                "requeue.progressIntervalSeconds must be greater than 0"
            ));
        }
        if config.capability_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("capabilityTimeoutSeconds must be greater than 0"));
        }
        if let Some(ns) = &config.watch_namespace {
            if ns.trim().is_empty() {
                return Err(anyhow::anyhow!("watchNamespace must not be empty"));
            }
        }
        if let Some(selector) = &config.namespace_selector {
            Selector::try_from(selector.clone())
                .map_err(|e| anyhow::anyhow!("namespaceSelector is invalid: {}", e))?;
        }
        tracing_subscriber::EnvFilter::try_new(&config.logger.level)
            .with_context(|| format!("logger.level is invalid: {}", config.logger.level))?;
        Ok(())
    }

    /// Load default configuration
    pub fn load_defaults() -> Config {
        defaults::default_config()
    }

    /// Merge two configurations, with `other` taking precedence
    fn merge_config(base: Config, other: Config) -> Config {
        Config {
            watch_namespace: other.watch_namespace.or(base.watch_namespace),
            namespace_selector: other.namespace_selector.or(base.namespace_selector),
            concurrency: other.concurrency,
            requeue: other.requeue,
            capability_timeout_seconds: other.capability_timeout_seconds,
            logger: other.logger,
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(
        mut config: Config,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Config> {
        // TBNCO_WATCH_NAMESPACE override, empty means all namespaces
        if let Some(namespace) = var("TBNCO_WATCH_NAMESPACE") {
            config.watch_namespace = Some(namespace).filter(|ns| !ns.is_empty());
        }

        // TBNCO_NAMESPACE_SELECTOR override
        if let Some(selector) = var("TBNCO_NAMESPACE_SELECTOR") {
            config.namespace_selector = Some(
                parse_match_labels(&selector).context("TBNCO_NAMESPACE_SELECTOR is invalid")?,
            );
        }

        // TBNCO_CONCURRENCY override
        if let Some(concurrency) = var("TBNCO_CONCURRENCY") {
            config.concurrency = concurrency
                .parse()
                .context("TBNCO_CONCURRENCY must be a number")?;
        }

        // TBNCO_LOG_LEVEL override
        if let Some(level) = var("TBNCO_LOG_LEVEL") {
            config.logger.level = level;
        }

        Ok(config)
    }
}

/// Parse `k=v,k2=v2` into a selector on exact label values
fn parse_match_labels(value: &str) -> Result<LabelSelector> {
    let mut labels = BTreeMap::new();
    for pair in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, val) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("expected key=value, got '{}'", pair))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(anyhow::anyhow!("empty label key in '{}'", pair));
        }
        labels.insert(key.to_string(), val.trim().to_string());
    }
    Ok(LabelSelector {
        match_labels: Some(labels),
        ..Default::default()
    })
}
