//! Network persistence
//!
//! `NetworkStore` is the storage seam of the reconciliation loop. Every write
//! carries the resourceVersion the caller read, so a write based on a stale
//! read is rejected with [`Error::Conflict`] instead of being merged.

use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::json;

#[cfg(test)]
use mockall::automock;

use crate::error::{Error, Result};
use crate::models::{Network, ObjectKey};

/// Field manager recorded on every write
pub const FIELD_MANAGER: &str = "tbnco-controller";

/// Get and persist Network objects
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NetworkStore: Send + Sync {
    /// Fetch the current object, `None` if it does not exist
    async fn get(&self, key: &ObjectKey) -> Result<Option<Network>>;

    /// Persist `network.status` through the status subresource
    async fn replace_status(&self, network: &Network) -> Result<Network>;

    /// Persist `network.metadata.finalizers`
    async fn replace_finalizers(&self, network: &Network) -> Result<Network>;
}

/// `NetworkStore` backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeNetworkStore {
    client: Client,
}

impl KubeNetworkStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Network> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl NetworkStore for KubeNetworkStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<Network>> {
        self.api(&key.namespace)
            .get_opt(&key.name)
            .await
            .map_err(|e| classify(e, key))
    }

    async fn replace_status(&self, network: &Network) -> Result<Network> {
        let key = network.key();
        let patch = status_patch(network);
        self.api(&key.namespace)
            .patch_status(&key.name, &patch_params(), &Patch::Merge(&patch))
            .await
            .map_err(|e| classify(e, &key))
    }

    async fn replace_finalizers(&self, network: &Network) -> Result<Network> {
        let key = network.key();
        let patch = finalizers_patch(network);
        self.api(&key.namespace)
            .patch(&key.name, &patch_params(), &Patch::Merge(&patch))
            .await
            .map_err(|e| classify(e, &key))
    }
}

fn patch_params() -> PatchParams {
    PatchParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..PatchParams::default()
    }
}

/// Merge patch for the status subresource, guarded by resourceVersion
fn status_patch(network: &Network) -> serde_json::Value {
    json!({
        "metadata": { "resourceVersion": network.resource_version() },
        "status": network.status_or_default(),
    })
}

/// Merge patch replacing the finalizer list, guarded by resourceVersion
fn finalizers_patch(network: &Network) -> serde_json::Value {
    json!({
        "metadata": {
            "resourceVersion": network.resource_version(),
            "finalizers": network.finalizers(),
        }
    })
}

/// Map API status codes onto the error taxonomy
fn classify(err: kube::Error, key: &ObjectKey) -> Error {
    match err {
        kube::Error::Api(resp) if resp.code == 409 => Error::Conflict(key.clone()),
        kube::Error::Api(resp) if resp.code == 404 => Error::NotFound(key.clone()),
        other => Error::Kube(other),
    }
}
