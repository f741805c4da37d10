//! Finalizer protocol
//!
//! The controller's finalizer token blocks physical deletion of a Network
//! until the finalize capability has confirmed cleanup. Token mutations are
//! pure edits on the finalizer list and report whether a write is needed.

use crate::models::Network;

/// Finalizer token owned by this controller
///
/// Follows the `<group>/finalizer` naming scheme.
pub const NETWORK_FINALIZER: &str = "network.tbnco.github.io/finalizer";

/// Result of adding or removing a finalizer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizerMutation {
    /// The token was appended; the object must be persisted
    Added,
    /// The token was already there; nothing to write
    AlreadyPresent,
    /// The token was dropped; the object must be persisted
    Removed,
    /// The token was not there; nothing to write
    AlreadyAbsent,
}

impl FinalizerMutation {
    /// True when the finalizer list actually changed
    pub fn is_mutated(&self) -> bool {
        matches!(self, FinalizerMutation::Added | FinalizerMutation::Removed)
    }
}

/// Where a Network stands in the finalizer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizerState {
    /// Live object that does not carry the token yet
    NoFinalizer,
    /// Live object guarded by the token
    Active,
    /// Deletion requested while the token is still held; cleanup pending
    Finalizing,
    /// Deletion requested and the token is gone; storage may remove it
    Released,
}

/// Classify a Network against a finalizer token
pub fn finalizer_state(network: &Network, token: &str) -> FinalizerState {
    let held = has_finalizer(network, token);
    match (network.is_deleting(), held) {
        (false, false) => FinalizerState::NoFinalizer,
        (false, true) => FinalizerState::Active,
        (true, true) => FinalizerState::Finalizing,
        (true, false) => FinalizerState::Released,
    }
}

pub fn has_finalizer(network: &Network, token: &str) -> bool {
    network
        .metadata
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|t| t == token))
}

/// Append `token` unless it is already present
pub fn add_finalizer(network: &mut Network, token: &str) -> FinalizerMutation {
    let finalizers = network.metadata.finalizers.get_or_insert_with(Vec::new);
    if finalizers.iter().any(|t| t == token) {
        return FinalizerMutation::AlreadyPresent;
    }
    finalizers.push(token.to_string());
    FinalizerMutation::Added
}

/// Drop every occurrence of `token`, preserving the order of the others
pub fn remove_finalizer(network: &mut Network, token: &str) -> FinalizerMutation {
    let Some(finalizers) = network.metadata.finalizers.as_mut() else {
        return FinalizerMutation::AlreadyAbsent;
    };
    let before = finalizers.len();
    finalizers.retain(|t| t != token);
    if finalizers.len() == before {
        FinalizerMutation::AlreadyAbsent
    } else {
        FinalizerMutation::Removed
    }
}
