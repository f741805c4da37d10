//! Namespace label filter
//!
//! Admits an event only if the namespace owning the changed object carries
//! labels matching a selector. The namespace is resolved through an injected
//! lookup so the filter itself stays free of I/O.

use std::sync::Arc;

use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::core::{Selector, SelectorExt};
use kube::runtime::reflector::{ObjectRef, Store};
use kube::ResourceExt;

use super::{Event, Predicate};

/// Why a namespace could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("Namespace {0} not found")]
    NotFound(String),
    #[error("Object is not namespaced")]
    ClusterScoped,
    #[error("Namespace lookup unavailable: {0}")]
    Unavailable(String),
}

/// Resolves a namespace by name
pub trait NamespaceLookup: Send + Sync {
    fn lookup(&self, name: &str) -> Result<Arc<Namespace>, LookupError>;
}

/// Lookups served from a namespace reflector cache
impl NamespaceLookup for Store<Namespace> {
    fn lookup(&self, name: &str) -> Result<Arc<Namespace>, LookupError> {
        self.get(&ObjectRef::new(name))
            .ok_or_else(|| LookupError::NotFound(name.to_string()))
    }
}

impl<L: NamespaceLookup + ?Sized> NamespaceLookup for Arc<L> {
    fn lookup(&self, name: &str) -> Result<Arc<Namespace>, LookupError> {
        (**self).lookup(name)
    }
}

/// The selector could not be turned into label expressions
#[derive(Debug, thiserror::Error)]
#[error("Invalid namespace selector: {0}")]
pub struct InvalidSelector(pub String);

/// Filters events by the labels of the object's namespace
pub struct NamespaceFilter<L> {
    selector: Selector,
    lookup: L,
}

impl<L: NamespaceLookup> NamespaceFilter<L> {
    /// Build a filter from a Kubernetes label selector
    ///
    /// An empty selector matches every namespace that can be resolved.
    pub fn new(selector: &LabelSelector, lookup: L) -> Result<Self, InvalidSelector> {
        let selector =
            Selector::try_from(selector.clone()).map_err(|e| InvalidSelector(e.to_string()))?;
        Ok(Self { selector, lookup })
    }

    fn admits_object<K: ResourceExt>(&self, object: &K) -> bool {
        let namespace = match object.namespace() {
            Some(ns) => self.lookup.lookup(&ns),
            None => Err(LookupError::ClusterScoped),
        };
        match namespace {
            Ok(ns) => self.selector.matches(ns.labels()),
            Err(_) => false,
        }
    }
}

impl<K, L> Predicate<K> for NamespaceFilter<L>
where
    K: ResourceExt,
    L: NamespaceLookup,
{
    fn admits(&self, event: &Event<'_, K>) -> bool {
        self.admits_object(event.object)
    }
}
