//! Domain capabilities plugged into the reconciliation loop
//!
//! The loop owns the protocol (conditions, finalizer, persistence); what it
//! means to converge or clean up a Network is supplied through these traits.
//! Implementations must be safe to call again after a failure and must not
//! hang: the loop bounds each call with a timeout and drops the future on
//! shutdown.

use std::time::Duration;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::models::Network;

/// Outcome of a convergence attempt that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Convergence {
    /// Real-world state matches the spec
    Converged,
    /// Work was started or is ongoing; check again later
    InProgress {
        reason: String,
        message: String,
        retry_after: Option<Duration>,
    },
}

impl Convergence {
    pub fn in_progress(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Convergence::InProgress {
            reason: reason.into(),
            message: message.into(),
            retry_after: None,
        }
    }
}

/// Drives real-world state towards a Network's spec
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Converge: Send + Sync {
    async fn converge(&self, network: &Network) -> anyhow::Result<Convergence>;
}

/// Releases whatever a Network owns before it is deleted
///
/// Returning `Ok(())` is the only success signal.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Finalize: Send + Sync {
    async fn finalize(&self, network: &Network) -> anyhow::Result<()>;
}

/// Capability that considers every Network converged and has nothing to
/// clean up
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

#[async_trait]
impl Converge for Noop {
    async fn converge(&self, network: &Network) -> anyhow::Result<Convergence> {
        tracing::debug!(network = %network.key(), "No convergence work configured");
        Ok(Convergence::Converged)
    }
}

#[async_trait]
impl Finalize for Noop {
    async fn finalize(&self, network: &Network) -> anyhow::Result<()> {
        tracing::debug!(network = %network.key(), "No finalize work configured");
        Ok(())
    }
}
