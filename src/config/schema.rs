//! Configuration schema definitions
//!
//! Defines the structure of configuration files using serde for serialization.

use std::time::Duration;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use serde::{Deserialize, Serialize};

use crate::controller::{NETWORK_FINALIZER, ReconcilerOptions, RuntimeOptions};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Only watch Networks in this namespace (all namespaces when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_namespace: Option<String>,

    /// Label selector a namespace must match for its Networks to be reconciled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<LabelSelector>,

    /// Max parallel reconciles, 0 for unbounded
    #[serde(default = "default_concurrency")]
    pub concurrency: u16,

    /// Requeue timing
    #[serde(default)]
    pub requeue: RequeueConfig,

    /// Upper bound for one converge or finalize call
    #[serde(default = "default_capability_timeout_seconds")]
    pub capability_timeout_seconds: u64,

    /// Logger configuration
    #[serde(default)]
    pub logger: LoggerConfig,
}

/// Requeue configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequeueConfig {
    /// Delay before retrying a failed reconcile
    #[serde(default = "default_error_backoff_seconds")]
    pub error_backoff_seconds: u64,

    /// Delay before checking back on an in-progress convergence
    #[serde(default = "default_progress_interval_seconds")]
    pub progress_interval_seconds: u64,
}

/// Logger configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoggerConfig {
    /// Default filter directive, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Colored output
    #[serde(default = "default_true")]
    pub ansi: bool,
}

// Default value functions
fn default_concurrency() -> u16 {
    0
}

fn default_capability_timeout_seconds() -> u64 {
    300
}

fn default_error_backoff_seconds() -> u64 {
    30
}

fn default_progress_interval_seconds() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            namespace_selector: None,
            concurrency: default_concurrency(),
            requeue: RequeueConfig::default(),
            capability_timeout_seconds: default_capability_timeout_seconds(),
            logger: LoggerConfig::default(),
        }
    }
}

impl Default for RequeueConfig {
    fn default() -> Self {
        Self {
            error_backoff_seconds: default_error_backoff_seconds(),
            progress_interval_seconds: default_progress_interval_seconds(),
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            ansi: default_true(),
        }
    }
}

impl Config {
    /// Controller settings derived from this configuration
    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            watch_namespace: self.watch_namespace.clone(),
            namespace_selector: self.namespace_selector.clone().unwrap_or_default(),
            concurrency: self.concurrency,
            error_backoff: Duration::from_secs(self.requeue.error_backoff_seconds),
            reconciler: ReconcilerOptions {
                finalizer: NETWORK_FINALIZER.to_string(),
                capability_timeout: Duration::from_secs(self.capability_timeout_seconds),
                progress_interval: Duration::from_secs(self.requeue.progress_interval_seconds),
            },
        }
    }
}
