//! Network model layer
//!
//! Structure:
//! - `network.rs` - the Network custom resource and its status helpers
//! - `conditions.rs` - condition types and the set/find primitives
//! - `mod.rs` - object identity and public API re-exports

pub mod conditions;
pub mod network;

pub use conditions::{Condition, ConditionStatus, ConditionType};
pub use network::{Network, NetworkSpec, NetworkStatus};

use std::fmt;

/// Namespaced identity of an object, as delivered by the work queue
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
