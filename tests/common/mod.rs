//! Shared fixtures for integration tests
//!
//! `MemoryStore` behaves like the API server as far as the reconciler can
//! tell: resourceVersion is bumped on every write, stale writes are rejected,
//! status and finalizer writes touch disjoint fields, and an object marked
//! for deletion disappears once its last finalizer is removed.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::ResourceExt;
use tbnco::cluster::NetworkStore;
use tbnco::controller::Noop;
use tbnco::{
    Converge, Convergence, Error, Finalize, Network, NetworkSpec, ObjectKey, Reconciler,
    ReconcilerOptions, Result,
};

#[derive(Default)]
struct State {
    objects: BTreeMap<ObjectKey, Network>,
    /// Last stored version of physically deleted objects
    tombstones: BTreeMap<ObjectKey, Network>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    version: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn next_version(&self) -> Option<String> {
        Some((self.version.fetch_add(1, Ordering::SeqCst) + 1).to_string())
    }

    /// Store a new object the way the API server would on create
    pub fn create(&self, namespace: &str, name: &str) -> ObjectKey {
        let mut network = Network::new(name, NetworkSpec::default());
        network.metadata.namespace = Some(namespace.to_string());
        network.metadata.generation = Some(1);
        network.metadata.resource_version = self.next_version();
        let key = ObjectKey::new(namespace, name);
        self.state
            .lock()
            .unwrap()
            .objects
            .insert(key.clone(), network);
        key
    }

    /// Current stored object
    pub fn fetch(&self, key: &ObjectKey) -> Option<Network> {
        self.state.lock().unwrap().objects.get(key).cloned()
    }

    /// Object as it was right before physical deletion
    pub fn tombstone(&self, key: &ObjectKey) -> Option<Network> {
        self.state.lock().unwrap().tombstones.get(key).cloned()
    }

    /// Request deletion; removes the object at once if nothing holds it
    pub fn request_deletion(&self, key: &ObjectKey) {
        let mut state = self.state.lock().unwrap();
        let Some(mut network) = state.objects.remove(key) else {
            return;
        };
        if network.metadata.finalizers.as_ref().is_none_or(|f| f.is_empty()) {
            state.tombstones.insert(key.clone(), network);
            return;
        }
        let ts: Time = serde_json::from_value(serde_json::json!("2024-01-01T00:00:00Z")).unwrap();
        network.metadata.deletion_timestamp = Some(ts);
        network.metadata.resource_version = self.next_version();
        state.objects.insert(key.clone(), network);
    }

    /// Simulate another writer touching the object
    pub fn touch(&self, key: &ObjectKey) {
        let mut state = self.state.lock().unwrap();
        if let Some(network) = state.objects.get_mut(key) {
            network
                .labels_mut()
                .insert("touched".to_string(), "true".to_string());
            network.metadata.resource_version = self.next_version();
        }
    }

    fn write(
        &self,
        incoming: &Network,
        apply: impl FnOnce(&mut Network, &Network),
    ) -> Result<Network> {
        let key = incoming.key();
        let mut state = self.state.lock().unwrap();
        let Some(stored) = state.objects.get_mut(&key) else {
            return Err(Error::NotFound(key));
        };
        if stored.metadata.resource_version != incoming.metadata.resource_version {
            return Err(Error::Conflict(key));
        }
        apply(stored, incoming);
        stored.metadata.resource_version = self.next_version();
        let written = stored.clone();

        let released = written.metadata.deletion_timestamp.is_some()
            && written.metadata.finalizers.as_ref().is_none_or(|f| f.is_empty());
        if released {
            state.objects.remove(&key);
            state.tombstones.insert(key, written.clone());
        }
        Ok(written)
    }
}

#[async_trait]
impl NetworkStore for MemoryStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<Network>> {
        Ok(self.fetch(key))
    }

    async fn replace_status(&self, network: &Network) -> Result<Network> {
        self.write(network, |stored, incoming| {
            stored.status = incoming.status.clone();
        })
    }

    async fn replace_finalizers(&self, network: &Network) -> Result<Network> {
        self.write(network, |stored, incoming| {
            stored.metadata.finalizers = incoming.metadata.finalizers.clone();
        })
    }
}

/// Converge capability replaying a fixed script, then reporting converged
#[derive(Default)]
pub struct ScriptedConverge {
    script: Mutex<VecDeque<anyhow::Result<Convergence>>>,
    calls: AtomicUsize,
}

impl ScriptedConverge {
    pub fn new(script: Vec<anyhow::Result<Convergence>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Converge for ScriptedConverge {
    async fn converge(&self, _network: &Network) -> anyhow::Result<Convergence> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Convergence::Converged))
    }
}

/// Finalize capability replaying a fixed script, then succeeding
#[derive(Default)]
pub struct ScriptedFinalize {
    script: Mutex<VecDeque<anyhow::Result<()>>>,
    calls: AtomicUsize,
}

impl ScriptedFinalize {
    pub fn new(script: Vec<anyhow::Result<()>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Finalize for ScriptedFinalize {
    async fn finalize(&self, _network: &Network) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

/// Everything one test needs, built fresh per test
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub converger: Arc<ScriptedConverge>,
    pub finalizer: Arc<ScriptedFinalize>,
    pub reconciler: Reconciler,
}

impl Fixture {
    pub fn new(
        converge: Vec<anyhow::Result<Convergence>>,
        finalize: Vec<anyhow::Result<()>>,
    ) -> Self {
        let store = MemoryStore::new();
        let converger = ScriptedConverge::new(converge);
        let finalizer = ScriptedFinalize::new(finalize);
        let reconciler = Reconciler::new(
            store.clone(),
            converger.clone(),
            finalizer.clone(),
            ReconcilerOptions::default(),
        );
        Self {
            store,
            converger,
            finalizer,
            reconciler,
        }
    }

    /// Fixture whose capabilities always succeed
    pub fn converging() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

/// Reconciler with no-op capabilities over `store`
pub fn noop_reconciler(store: Arc<MemoryStore>) -> Reconciler {
    Reconciler::new(store, Arc::new(Noop), Arc::new(Noop), ReconcilerOptions::default())
}
