//! CRD command handler

use anyhow::{Context, Result};
use kube::CustomResourceExt;

use crate::models::Network;

/// Render the Network CustomResourceDefinition as YAML
pub fn crd_yaml() -> Result<String> {
    serde_yaml::to_string(&Network::crd()).context("Failed to serialize CustomResourceDefinition")
}

/// Print the Network CustomResourceDefinition, ready for `kubectl apply -f -`
pub fn print_crd() -> Result<()> {
    print!("{}", crd_yaml()?);
    Ok(())
}
