//! Error types returned by the reconciliation core

use std::time::Duration;

use crate::models::ObjectKey;
use crate::predicate::InvalidSelector;

/// Errors surfaced by a reconcile invocation or its storage collaborator
///
/// Every variant is retryable from the scheduler's point of view: the next
/// invocation re-fetches the object and starts over.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The object no longer exists in the store
    #[error("Network {0} not found")]
    NotFound(ObjectKey),

    /// A write was rejected because the stored resourceVersion moved on
    #[error("Conflict writing Network {0}: object changed since it was read")]
    Conflict(ObjectKey),

    /// The convergence capability reported a failure
    #[error("Convergence of Network {key} failed: {source}")]
    Convergence {
        key: ObjectKey,
        #[source]
        source: anyhow::Error,
    },

    /// The finalize capability reported a failure
    #[error("Finalizing Network {key} failed: {source}")]
    Finalize {
        key: ObjectKey,
        #[source]
        source: anyhow::Error,
    },

    /// A capability did not finish within the configured bound
    #[error("{operation} of Network {key} timed out after {after:?}")]
    CapabilityTimeout {
        key: ObjectKey,
        operation: &'static str,
        after: Duration,
    },

    /// Transport or API failure from the Kubernetes client
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// The configured namespace selector cannot be evaluated
    #[error(transparent)]
    Selector(#[from] InvalidSelector),
}

impl Error {
    /// True for optimistic-concurrency rejections
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Short machine token, used as a log field by the runtime
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "NotFound",
            Error::Conflict(_) => "Conflict",
            Error::Convergence { .. } => "ConvergenceFailure",
            Error::Finalize { .. } => "FinalizeFailure",
            Error::CapabilityTimeout { .. } => "CapabilityTimeout",
            Error::Kube(_) => "KubeError",
            Error::Selector(_) => "InvalidSelector",
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
