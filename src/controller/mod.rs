//! Network controller
//!
//! Structure:
//! - `reconciler.rs` - the per-object reconciliation loop
//! - `finalizer.rs` - finalizer token protocol
//! - `capability.rs` - pluggable converge/finalize behavior
//! - `runtime.rs` - kube-runtime controller wiring

pub mod capability;
pub mod finalizer;
pub mod reconciler;
pub mod runtime;

pub use capability::{Converge, Convergence, Finalize, Noop};
pub use finalizer::{
    FinalizerMutation, FinalizerState, NETWORK_FINALIZER, add_finalizer, finalizer_state,
    has_finalizer, remove_finalizer,
};
pub use reconciler::{ReconcileOutcome, Reconciler, ReconcilerOptions};
pub use runtime::{RuntimeOptions, run};
