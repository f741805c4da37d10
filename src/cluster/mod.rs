//! Kubernetes cluster access
//!
//! Connection setup and the API-server backed implementations of the
//! controller's storage seam.
//!
//! Proxy settings come from the standard `HTTP_PROXY` / `HTTPS_PROXY` /
//! `NO_PROXY` environment variables through kube's `http-proxy` support.

pub mod store;

pub use store::{FIELD_MANAGER, KubeNetworkStore, NetworkStore};

#[cfg(test)]
pub use store::MockNetworkStore;

use anyhow::{Context, Result};
use kube::{Client, Config};

/// Initialize and return a Kubernetes client
///
/// Uses the default kubeconfig loading strategy:
/// 1. In-cluster config (if running in a pod)
/// 2. KUBECONFIG environment variable
/// 3. ~/.kube/config
pub async fn create_client() -> Result<Client> {
    let config = Config::infer()
        .await
        .context("Failed to load Kubernetes configuration")?;
    tracing::debug!(cluster = %config.cluster_url, "Connecting to cluster");
    Client::try_from(config).context("Failed to create Kubernetes client")
}
