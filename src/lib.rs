//! tbnco library
//!
//! A Kubernetes controller that reconciles `Network` custom resources:
//! it keeps their `Available`/`Progressing`/`Degraded` conditions current,
//! guards deletion with a finalizer and only acts on Networks whose
//! namespace matches a label selector.
//!
//! The binary wires these pieces to a live cluster; the library is also
//! used directly by the integration tests.

pub mod cli;
pub mod cluster;
pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod predicate;

// Re-export commonly used types for convenience
pub use controller::{
    Converge, Convergence, Finalize, NETWORK_FINALIZER, ReconcileOutcome, Reconciler,
    ReconcilerOptions,
};
pub use error::{Error, Result};
pub use models::{
    Condition, ConditionStatus, ConditionType, Network, NetworkSpec, NetworkStatus, ObjectKey,
};
