//! Reconciliation loop
//!
//! One invocation handles one Network identifier:
//! fetch → default conditions → ensure finalizer → converge or finalize.
//!
//! Every write goes through [`NetworkStore`] and is based on the object
//! returned by the previous write, so a concurrent change anywhere in the
//! sequence surfaces as [`Error::Conflict`]. The loop never retries on its
//! own; the scheduler re-invokes it and the next run starts from a fresh
//! fetch.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::capability::{Converge, Convergence, Finalize};
use super::finalizer::{FinalizerMutation, add_finalizer, has_finalizer, remove_finalizer};
use crate::cluster::NetworkStore;
use crate::error::{Error, Result};
use crate::models::conditions::reason;
use crate::models::{Network, ObjectKey};

/// Completion signal handed back to the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing left to do until the object changes again
    Done,
    /// Run again, after the given delay if any
    Requeue(Option<Duration>),
}

/// Tunables for the loop
#[derive(Debug, Clone)]
pub struct ReconcilerOptions {
    /// Finalizer token owned by this controller
    pub finalizer: String,
    /// Upper bound for a single converge or finalize call
    pub capability_timeout: Duration,
    /// Delay before checking back on a convergence still in progress
    pub progress_interval: Duration,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            finalizer: super::NETWORK_FINALIZER.to_string(),
            capability_timeout: Duration::from_secs(300),
            progress_interval: Duration::from_secs(10),
        }
    }
}

/// Executes the per-resource state machine
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn NetworkStore>,
    converger: Arc<dyn Converge>,
    finalizer: Arc<dyn Finalize>,
    options: ReconcilerOptions,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn NetworkStore>,
        converger: Arc<dyn Converge>,
        finalizer: Arc<dyn Finalize>,
        options: ReconcilerOptions,
    ) -> Self {
        Self {
            store,
            converger,
            finalizer,
            options,
        }
    }

    pub fn options(&self) -> &ReconcilerOptions {
        &self.options
    }

    /// Reconcile the Network identified by `key`
    ///
    /// An object that is gone, or disappears halfway through, counts as done.
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileOutcome> {
        match self.reconcile_existing(key).await {
            Err(Error::NotFound(_)) => Ok(ReconcileOutcome::Done),
            other => other,
        }
    }

    async fn reconcile_existing(&self, key: &ObjectKey) -> Result<ReconcileOutcome> {
        let Some(mut network) = self.store.get(key).await? else {
            return Ok(ReconcileOutcome::Done);
        };
        let now = Utc::now();

        network.status = Some(network.status_or_default().with_condition_defaults(now));
        let mut network = self.store.replace_status(&network).await?;

        if !network.is_deleting()
            && add_finalizer(&mut network, &self.options.finalizer) == FinalizerMutation::Added
        {
            network = self.store.replace_finalizers(&network).await?;
        }

        if network.is_deleting() {
            self.finalize(network, now).await
        } else {
            self.converge(network, now).await
        }
    }

    async fn converge(
        &self,
        mut network: Network,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome> {
        let key = network.key();
        let attempt = self
            .bounded("Convergence", &key, self.converger.converge(&network), |key, source| {
                Error::Convergence { key, source }
            })
            .await;

        match attempt {
            Ok(Convergence::Converged) => {
                network.status = Some(network.status_or_default().with_available(now));
                self.store.replace_status(&network).await?;
                Ok(ReconcileOutcome::Done)
            }
            Ok(Convergence::InProgress {
                reason,
                message,
                retry_after,
            }) => {
                network.status = Some(
                    network
                        .status_or_default()
                        .with_progressing(&reason, &message, now),
                );
                self.store.replace_status(&network).await?;
                Ok(ReconcileOutcome::Requeue(Some(
                    retry_after.unwrap_or(self.options.progress_interval),
                )))
            }
            Err(err) => {
                network.status = Some(network.status_or_default().with_degraded(
                    reason::CONVERGENCE_FAILED,
                    &failure_message(&err),
                    now,
                ));
                self.store.replace_status(&network).await?;
                Err(err)
            }
        }
    }

    async fn finalize(
        &self,
        mut network: Network,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome> {
        if !has_finalizer(&network, &self.options.finalizer) {
            return Ok(ReconcileOutcome::Done);
        }
        let key = network.key();

        network.status = Some(network.status_or_default().with_degraded(
            reason::FINALIZING,
            "Performing finalizer operations",
            now,
        ));
        let mut network = self.store.replace_status(&network).await?;

        let attempt = self
            .bounded("Finalize", &key, self.finalizer.finalize(&network), |key, source| {
                Error::Finalize { key, source }
            })
            .await;

        if let Err(err) = attempt {
            network.status = Some(network.status_or_default().with_degraded(
                reason::FINALIZE_FAILED,
                &failure_message(&err),
                now,
            ));
            self.store.replace_status(&network).await?;
            return Err(err);
        }

        network.status = Some(network.status_or_default().with_degraded(
            reason::FINALIZER_EXECUTED,
            "Finalizer operations completed",
            now,
        ));
        let mut network = self.store.replace_status(&network).await?;

        match remove_finalizer(&mut network, &self.options.finalizer) {
            FinalizerMutation::Removed => {
                self.store.replace_finalizers(&network).await?;
                Ok(ReconcileOutcome::Done)
            }
            _ => Ok(ReconcileOutcome::Requeue(None)),
        }
    }

    /// Run a capability call under the configured timeout
    async fn bounded<T>(
        &self,
        operation: &'static str,
        key: &ObjectKey,
        call: impl Future<Output = anyhow::Result<T>>,
        wrap: impl FnOnce(ObjectKey, anyhow::Error) -> Error,
    ) -> Result<T> {
        let after = self.options.capability_timeout;
        match tokio::time::timeout(after, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(wrap(key.clone(), source)),
            Err(_) => Err(Error::CapabilityTimeout {
                key: key.clone(),
                operation,
                after,
            }),
        }
    }
}

/// Text recorded in a condition message for a failed capability
fn failure_message(err: &Error) -> String {
    match err {
        Error::Convergence { source, .. } | Error::Finalize { source, .. } => {
            format!("{:#}", source)
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MockNetworkStore;
    use crate::controller::capability::{MockConverge, MockFinalize, Noop};
    use crate::controller::NETWORK_FINALIZER;
    use crate::models::{ConditionType, NetworkSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use std::sync::Mutex;

    fn key() -> ObjectKey {
        ObjectKey::new("default", "foo")
    }

    fn network(finalizers: &[&str], deleting: bool) -> Network {
        let mut n = Network::new("foo", NetworkSpec::default());
        n.metadata.namespace = Some("default".to_string());
        n.metadata.resource_version = Some("1".to_string());
        n.metadata.finalizers = Some(finalizers.iter().map(|f| f.to_string()).collect());
        if deleting {
            let ts: Time =
                serde_json::from_value(serde_json::json!("2024-01-01T00:00:00Z")).unwrap();
            n.metadata.deletion_timestamp = Some(ts);
        }
        n
    }

    /// Store mock that echoes every write back and records it
    fn echo_store(
        initial: Option<Network>,
        writes: Arc<Mutex<Vec<(&'static str, Network)>>>,
    ) -> MockNetworkStore {
        let mut store = MockNetworkStore::new();
        store.expect_get().returning(move |_| Ok(initial.clone()));
        let status_writes = writes.clone();
        store.expect_replace_status().returning(move |n| {
            status_writes.lock().unwrap().push(("status", n.clone()));
            Ok(n.clone())
        });
        store.expect_replace_finalizers().returning(move |n| {
            writes.lock().unwrap().push(("finalizers", n.clone()));
            Ok(n.clone())
        });
        store
    }

    fn reconciler(
        store: MockNetworkStore,
        converger: Arc<dyn Converge>,
        finalizer: Arc<dyn Finalize>,
    ) -> Reconciler {
        Reconciler::new(
            Arc::new(store),
            converger,
            finalizer,
            ReconcilerOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_missing_object_is_done() {
        let mut store = MockNetworkStore::new();
        store.expect_get().returning(|_| Ok(None));
        store.expect_replace_status().never();
        store.expect_replace_finalizers().never();

        let r = reconciler(store, Arc::new(Noop), Arc::new(Noop));
        assert_eq!(r.reconcile(&key()).await.unwrap(), ReconcileOutcome::Done);
    }

    #[tokio::test]
    async fn test_vanishing_mid_invocation_is_done() {
        let mut store = MockNetworkStore::new();
        store
            .expect_get()
            .returning(|_| Ok(Some(network(&[], false))));
        store
            .expect_replace_status()
            .returning(|_| Err(Error::NotFound(key())));

        let r = reconciler(store, Arc::new(Noop), Arc::new(Noop));
        assert_eq!(r.reconcile(&key()).await.unwrap(), ReconcileOutcome::Done);
    }

    #[tokio::test]
    async fn test_conflict_is_surfaced() {
        let mut store = MockNetworkStore::new();
        store
            .expect_get()
            .returning(|_| Ok(Some(network(&[], false))));
        store
            .expect_replace_status()
            .returning(|_| Err(Error::Conflict(key())));
        store.expect_replace_finalizers().never();

        let r = reconciler(store, Arc::new(Noop), Arc::new(Noop));
        let err = r.reconcile(&key()).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_finalizer_is_persisted_before_convergence() {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let store = echo_store(Some(network(&[], false)), writes.clone());

        let mut converger = MockConverge::new();
        let seen = writes.clone();
        converger.expect_converge().times(1).returning(move |n| {
            assert!(has_finalizer(n, NETWORK_FINALIZER));
            assert_eq!(seen.lock().unwrap().len(), 2);
            Ok(Convergence::Converged)
        });

        let r = reconciler(store, Arc::new(converger), Arc::new(Noop));
        assert_eq!(r.reconcile(&key()).await.unwrap(), ReconcileOutcome::Done);

        let kinds: Vec<_> = writes.lock().unwrap().iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, vec!["status", "finalizers", "status"]);
    }

    #[tokio::test]
    async fn test_present_finalizer_is_not_rewritten() {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let store = echo_store(Some(network(&[NETWORK_FINALIZER], false)), writes.clone());

        let r = reconciler(store, Arc::new(Noop), Arc::new(Noop));
        r.reconcile(&key()).await.unwrap();

        assert!(writes.lock().unwrap().iter().all(|(k, _)| *k == "status"));
    }

    #[tokio::test]
    async fn test_in_progress_requeues_with_progressing() {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let store = echo_store(Some(network(&[NETWORK_FINALIZER], false)), writes.clone());

        let mut converger = MockConverge::new();
        converger.expect_converge().returning(|_| {
            Ok(Convergence::InProgress {
                reason: "Provisioning".to_string(),
                message: "allocating subnet".to_string(),
                retry_after: Some(Duration::from_secs(3)),
            })
        });

        let r = reconciler(store, Arc::new(converger), Arc::new(Noop));
        assert_eq!(
            r.reconcile(&key()).await.unwrap(),
            ReconcileOutcome::Requeue(Some(Duration::from_secs(3)))
        );

        let last = writes.lock().unwrap().last().unwrap().1.clone();
        let status = last.status.unwrap();
        let progressing = status.condition(ConditionType::Progressing).unwrap();
        assert_eq!(progressing.reason, "Provisioning");
        assert!(!status.is_condition_true(ConditionType::Available));
    }

    #[tokio::test]
    async fn test_convergence_failure_is_recorded_and_returned() {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let store = echo_store(Some(network(&[NETWORK_FINALIZER], false)), writes.clone());

        let mut converger = MockConverge::new();
        converger
            .expect_converge()
            .returning(|_| Err(anyhow::anyhow!("subnet exhausted")));

        let r = reconciler(store, Arc::new(converger), Arc::new(Noop));
        let err = r.reconcile(&key()).await.unwrap_err();
        assert!(matches!(err, Error::Convergence { .. }));

        let last = writes.lock().unwrap().last().unwrap().1.clone();
        let degraded = last.status.unwrap().condition(ConditionType::Degraded).cloned().unwrap();
        assert_eq!(degraded.reason, reason::CONVERGENCE_FAILED);
        assert_eq!(degraded.message, "subnet exhausted");
    }

    #[tokio::test]
    async fn test_finalize_failure_keeps_token() {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let store = echo_store(Some(network(&[NETWORK_FINALIZER], true)), writes.clone());

        let mut finalizer = MockFinalize::new();
        finalizer
            .expect_finalize()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("route table busy")));

        let mut converger = MockConverge::new();
        converger.expect_converge().never();

        let r = reconciler(store, Arc::new(converger), Arc::new(finalizer));
        let err = r.reconcile(&key()).await.unwrap_err();
        assert!(matches!(err, Error::Finalize { .. }));

        let writes = writes.lock().unwrap();
        assert!(writes.iter().all(|(k, _)| *k == "status"));
        let last = &writes.last().unwrap().1;
        assert!(has_finalizer(last, NETWORK_FINALIZER));
        let degraded = last.status.as_ref().unwrap().condition(ConditionType::Degraded).unwrap();
        assert_eq!(degraded.reason, reason::FINALIZE_FAILED);
    }

    #[tokio::test]
    async fn test_deleting_without_token_is_noop() {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let store = echo_store(Some(network(&["other/finalizer"], true)), writes.clone());

        let mut finalizer = MockFinalize::new();
        finalizer.expect_finalize().never();

        let r = reconciler(store, Arc::new(Noop), Arc::new(finalizer));
        assert_eq!(r.reconcile(&key()).await.unwrap(), ReconcileOutcome::Done);

        // Only the unconditional defaults write happened; no token was added.
        let writes = writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert!(!has_finalizer(&writes[0].1, NETWORK_FINALIZER));
    }

    #[tokio::test]
    async fn test_slow_finalize_times_out() {
        struct Stuck;

        #[async_trait::async_trait]
        impl Finalize for Stuck {
            async fn finalize(&self, _network: &Network) -> anyhow::Result<()> {
                std::future::pending::<()>().await;
                Ok(())
            }
        }

        let writes = Arc::new(Mutex::new(Vec::new()));
        let store = echo_store(Some(network(&[NETWORK_FINALIZER], true)), writes);

        let options = ReconcilerOptions {
            capability_timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let r = Reconciler::new(Arc::new(store), Arc::new(Noop), Arc::new(Stuck), options);

        let err = r.reconcile(&key()).await.unwrap_err();
        assert!(matches!(err, Error::CapabilityTimeout { operation: "Finalize", .. }));
    }
}
