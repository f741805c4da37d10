//! Event filtering
//!
//! Predicates run upstream of the work queue and decide whether a change to
//! a watched object should trigger a reconcile at all. They never mutate and
//! never fail: anything that cannot be evaluated is treated as not matching.

mod namespace;

pub use namespace::*;

use std::fmt;

/// Kind of change delivered by the watch layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Create,
    Update,
    Delete,
    /// Re-observation not tied to a change of the object itself
    Generic,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Create => "create",
            EventKind::Update => "update",
            EventKind::Delete => "delete",
            EventKind::Generic => "generic",
        };
        f.write_str(s)
    }
}

/// A change event carrying the affected object
///
/// For updates this is the new version of the object.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a, K> {
    pub kind: EventKind,
    pub object: &'a K,
}

impl<'a, K> Event<'a, K> {
    pub fn new(kind: EventKind, object: &'a K) -> Self {
        Self { kind, object }
    }

    pub fn create(object: &'a K) -> Self {
        Self::new(EventKind::Create, object)
    }

    pub fn update(object: &'a K) -> Self {
        Self::new(EventKind::Update, object)
    }

    pub fn delete(object: &'a K) -> Self {
        Self::new(EventKind::Delete, object)
    }

    pub fn generic(object: &'a K) -> Self {
        Self::new(EventKind::Generic, object)
    }
}

/// Decides whether an event should reach the work queue
pub trait Predicate<K>: Send + Sync {
    fn admits(&self, event: &Event<'_, K>) -> bool;
}
