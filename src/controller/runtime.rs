//! kube-runtime wiring
//!
//! Builds the trigger stream for the controller out of two watchers:
//! - `Network` changes, mapped to create/update/delete events
//! - `Namespace` changes, which re-observe every Network in that namespace
//!
//! Both pass through the namespace filter before reaching the work queue.
//! The Network watcher only starts once the namespace cache holds its full
//! initial list, otherwise existing Networks would be filtered against an
//! empty cache and never triggered. The controller itself deduplicates per
//! object, so at most one reconcile runs for a given Network at any time.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt, TryStreamExt, future, stream};
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::Api;
use kube::runtime::controller::{Action, Config as ControllerConfig};
use kube::runtime::reflector::{self, Store};
use kube::runtime::{Controller, WatchStreamExt, watcher};
use kube::{Client, ResourceExt};

use super::capability::{Converge, Finalize};
use super::reconciler::{ReconcileOutcome, Reconciler, ReconcilerOptions};
use crate::cluster::KubeNetworkStore;
use crate::error::{Error, Result};
use crate::models::Network;
use crate::predicate::{Event, EventKind, NamespaceFilter, Predicate};

/// Settings for a controller run
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    /// Restrict watches to one namespace, all namespaces if `None`
    pub watch_namespace: Option<String>,
    /// Namespaces whose Networks are reconciled
    pub namespace_selector: LabelSelector,
    /// Max parallel reconciles, 0 for unbounded
    pub concurrency: u16,
    /// Delay before retrying a failed reconcile
    pub error_backoff: Duration,
    pub reconciler: ReconcilerOptions,
}

/// Shared state handed to every reconcile
pub struct Context {
    pub reconciler: Reconciler,
    pub error_backoff: Duration,
}

/// Controller entry point for a single Network
pub async fn reconcile(network: Arc<Network>, ctx: Arc<Context>) -> Result<Action> {
    let key = network.key();
    let outcome = ctx.reconciler.reconcile(&key).await?;
    tracing::debug!(namespace = %key.namespace, name = %key.name, ?outcome, "Reconciled");
    Ok(outcome_action(outcome))
}

/// Requeue policy for failed reconciles
pub fn error_policy(network: Arc<Network>, error: &Error, ctx: Arc<Context>) -> Action {
    let namespace = network.namespace().unwrap_or_default();
    let name = network.name_any();
    if error.is_conflict() {
        // Someone else wrote first; the next run reads their version.
        tracing::debug!(%namespace, %name, "Write conflict, retrying");
        return Action::requeue(Duration::ZERO);
    }
    tracing::warn!(
        %namespace,
        %name,
        kind = error.kind(),
        error = %error,
        "Reconcile failed"
    );
    Action::requeue(ctx.error_backoff)
}

fn outcome_action(outcome: ReconcileOutcome) -> Action {
    match outcome {
        ReconcileOutcome::Done => Action::await_change(),
        ReconcileOutcome::Requeue(after) => Action::requeue(after.unwrap_or(Duration::ZERO)),
    }
}

/// Map a Network watch event onto an event kind
///
/// Objects from the initial listing count as creations.
fn network_event(event: watcher::Event<Network>) -> Option<(EventKind, Network)> {
    match event {
        watcher::Event::InitApply(n) => Some((EventKind::Create, n)),
        watcher::Event::Apply(n) => Some((EventKind::Update, n)),
        watcher::Event::Delete(n) => Some((EventKind::Delete, n)),
        watcher::Event::Init | watcher::Event::InitDone => None,
    }
}

/// Networks in `namespace` that pass the filter as generic events
fn networks_in<P: Predicate<Network>>(
    networks: &Store<Network>,
    namespace: &Namespace,
    filter: &P,
) -> Vec<Network> {
    let name = namespace.name_any();
    networks
        .state()
        .into_iter()
        .filter(|n| n.namespace().as_deref() == Some(name.as_str()))
        .filter(|n| filter.admits(&Event::generic(n.as_ref())))
        .map(|n| (*n).clone())
        .collect()
}

/// Raw watch events, before any caching
pub type WatchEvents<K> = Result<watcher::Event<K>, watcher::Error>;

/// Build the controller's trigger stream from raw Network and Namespace
/// watch events
///
/// Returns the Network cache the controller reads objects from, and the
/// stream of Networks to reconcile.
pub fn trigger_stream<NW, NS>(
    network_events: NW,
    namespace_events: NS,
    selector: &LabelSelector,
) -> Result<(
    Store<Network>,
    impl Stream<Item = Result<Network, watcher::Error>> + Send + 'static,
)>
where
    NW: Stream<Item = WatchEvents<Network>> + Send + 'static,
    NS: Stream<Item = WatchEvents<Namespace>> + Send + 'static,
{
    let (network_reader, network_writer) = reflector::store::<Network>();
    let (namespace_reader, namespace_writer) = reflector::store::<Namespace>();

    let filter = Arc::new(NamespaceFilter::new(selector, namespace_reader.clone())?);

    let network_filter = filter.clone();
    let network_triggers = stream::once(async move {
        if namespace_reader.wait_until_ready().await.is_err() {
            tracing::warn!("Namespace cache closed before its initial list completed");
        }
        network_events
    })
    .flatten()
    .reflect(network_writer)
    .try_filter_map(move |event| {
        let admitted = network_event(event).and_then(|(kind, network)| {
            network_filter
                .admits(&Event::new(kind, &network))
                .then_some(network)
        });
        future::ready(Ok(admitted))
    });

    let known_networks = network_reader.clone();
    let namespace_triggers = namespace_events
        .reflect(namespace_writer)
        .applied_objects()
        .map_ok(move |namespace| {
            let matched = networks_in(&known_networks, &namespace, filter.as_ref());
            stream::iter(matched.into_iter().map(Ok::<_, watcher::Error>))
        })
        .try_flatten();

    Ok((
        network_reader,
        stream::select(network_triggers, namespace_triggers),
    ))
}

/// Run the Network controller until a shutdown signal arrives
pub async fn run(
    client: Client,
    options: RuntimeOptions,
    converger: Arc<dyn Converge>,
    finalizer: Arc<dyn Finalize>,
) -> Result<()> {
    let namespaces = Api::<Namespace>::all(client.clone());
    let (networks, namespace_watch) = match &options.watch_namespace {
        Some(ns) => (
            Api::<Network>::namespaced(client.clone(), ns),
            watcher::Config::default().fields(&format!("metadata.name={}", ns)),
        ),
        None => (
            Api::<Network>::all(client.clone()),
            watcher::Config::default(),
        ),
    };

    let (network_reader, triggers) = trigger_stream(
        watcher(networks, watcher::Config::default()).default_backoff(),
        watcher(namespaces, namespace_watch).default_backoff(),
        &options.namespace_selector,
    )?;

    let reconciler = Reconciler::new(
        Arc::new(KubeNetworkStore::new(client)),
        converger,
        finalizer,
        options.reconciler,
    );
    let ctx = Arc::new(Context {
        reconciler,
        error_backoff: options.error_backoff,
    });

    tracing::info!(
        namespace = options.watch_namespace.as_deref().unwrap_or("*"),
        concurrency = options.concurrency,
        "Starting Network controller"
    );

    Controller::for_stream(triggers, network_reader)
        .with_config(ControllerConfig::default().concurrency(options.concurrency))
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, _)) => tracing::trace!(
                    namespace = ?obj.namespace,
                    name = %obj.name,
                    "Reconcile finished"
                ),
                Err(err) => tracing::debug!(error = %err, "Controller event"),
            }
        })
        .await;

    tracing::info!("Network controller stopped");
    Ok(())
}
