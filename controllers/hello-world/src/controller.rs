//! Main controller implementation.
//!
//! Wires the [`Reconciler`] into `kube_runtime::Controller`: HelloWorld
//! objects are watched directly and Pods through their owner reference, so
//! Pod phase changes re-trigger the owning HelloWorld.
//!
//! Failed reconciliations are retried with a per-object Fibonacci backoff
//! that is reset after the next success.

use crate::backoff::BackoffState;
use crate::builder::{APP_LABEL, APP_LABEL_VALUE};
use crate::config::ControllerConfig;
use crate::context::ReconcileContext;
use crate::error::ControllerError;
use crate::observability::ReconcileObserver;
use crate::reconciler::{Reconciler, ResourceKey};
use crds::HelloWorld;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client};
use kube::api::DynamicObject;
use kube_runtime::controller::{Action, Controller, Error as ControllerStreamError};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::watcher;
use resource_store::{KubeStore, ResourceStore};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Requeue reason after a Pod was created
pub const REQUEUE_POD_CREATED: &str = "pod-created";
/// Requeue reason after a failed reconciliation
pub const REQUEUE_ERROR_BACKOFF: &str = "error-backoff";

/// Shared state handed to every reconcile invocation
pub struct Context {
    reconciler: Reconciler,
    observer: Arc<dyn ReconcileObserver>,
    cancel: watch::Receiver<bool>,
    request_timeout: Duration,
    requeue_after: Duration,
    backoff_min_secs: u64,
    backoff_max_secs: u64,
    /// Error count tracking per resource (namespace/name -> BackoffState)
    backoff_states: Mutex<HashMap<ResourceKey, BackoffState>>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("reconciler", &self.reconciler)
            .field("request_timeout", &self.request_timeout)
            .field("requeue_after", &self.requeue_after)
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn new(
        reconciler: Reconciler,
        observer: Arc<dyn ReconcileObserver>,
        cancel: watch::Receiver<bool>,
        config: &ControllerConfig,
    ) -> Self {
        Self {
            reconciler,
            observer,
            cancel,
            request_timeout: config.request_timeout,
            requeue_after: config.requeue_after,
            backoff_min_secs: config.backoff_min_secs,
            backoff_max_secs: config.backoff_max_secs,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    /// Next error delay for `key` and the number of consecutive errors so far
    fn next_backoff(&self, key: &ResourceKey) -> (Duration, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(key.clone())
                    .or_insert_with(|| BackoffState::new(self.backoff_min_secs, self.backoff_max_secs));
                state.increment_error();
                (state.backoff.next_backoff(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff states: {}, using minimum backoff", e);
                (Duration::from_secs(self.backoff_min_secs), 0)
            }
        }
    }

    /// Drops the backoff entry of an object that left the watch cache
    fn forget(&self, object: &ObjectRef<DynamicObject>) {
        let Some(namespace) = object.namespace.as_deref() else {
            return;
        };
        self.reset_backoff(&ResourceKey::new(namespace, object.name.as_str()));
    }

    fn reset_backoff(&self, key: &ResourceKey) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if states.remove(key).is_some() {
                debug!("Reset error backoff for {}", key);
            }
        }
    }
}

/// Reconcile entry point for `kube_runtime::Controller`
pub async fn reconcile(hello: Arc<HelloWorld>, ctx: Arc<Context>) -> Result<Action, ControllerError> {
    let key = ResourceKey::from_object(&hello)?;
    let reconcile_ctx = ReconcileContext::new(ctx.cancel.clone(), ctx.request_timeout);

    let result = ctx.reconciler.reconcile(&key, &reconcile_ctx).await?;
    ctx.reset_backoff(&key);

    if result.requeue {
        debug!("Requeueing {} in {}s", key, ctx.requeue_after.as_secs());
        ctx.observer.record_requeue(REQUEUE_POD_CREATED);
        Ok(Action::requeue(ctx.requeue_after))
    } else {
        Ok(Action::await_change())
    }
}

/// Error policy: requeue with the object's Fibonacci backoff
pub fn error_policy(hello: Arc<HelloWorld>, error: &ControllerError, ctx: Arc<Context>) -> Action {
    let key = match ResourceKey::from_object(&hello) {
        Ok(key) => key,
        Err(e) => {
            error!("Cannot track backoff for object without name/namespace: {}", e);
            ctx.observer.record_requeue(REQUEUE_ERROR_BACKOFF);
            return Action::requeue(Duration::from_secs(ctx.backoff_max_secs));
        }
    };

    let (delay, error_count) = ctx.next_backoff(&key);
    if error.is_retryable() {
        warn!(
            "Reconciliation of {} failed ({}), retrying in {}s (error count: {}): {}",
            key,
            error.kind(),
            delay.as_secs(),
            error_count,
            error
        );
    } else {
        error!(
            "Reconciliation of {} failed ({}) and needs outside intervention, retrying in {}s (error count: {}): {}",
            key,
            error.kind(),
            delay.as_secs(),
            error_count,
            error
        );
    }

    ctx.observer.record_requeue(REQUEUE_ERROR_BACKOFF);
    Action::requeue(delay)
}

/// Logs how many HelloWorld resources exist per namespace and seeds the gauge.
///
/// Failures are logged only: the CRD may not be installed yet.
pub async fn log_startup_summary(
    store: &dyn ResourceStore,
    observer: &dyn ReconcileObserver,
    namespace: Option<&str>,
) -> BTreeMap<String, i64> {
    let hello_worlds = match store.list_hello_worlds(namespace).await {
        Ok(items) => items,
        Err(e) => {
            warn!(
                "Could not list existing HelloWorld resources ({}), the CRD may not be installed yet: {}",
                e.kind(),
                e
            );
            return BTreeMap::new();
        }
    };

    let mut per_namespace: BTreeMap<String, i64> = BTreeMap::new();
    for hello in &hello_worlds {
        let ns = hello.metadata.namespace.clone().unwrap_or_default();
        *per_namespace.entry(ns).or_default() += 1;
    }

    info!("Found {} existing HelloWorld resource(s)", hello_worlds.len());
    for (ns, count) in &per_namespace {
        info!("  {}: {}", ns, count);
        observer.set_managed_resources(ns, *count);
    }
    per_namespace
}

/// Runs the controller until the shutdown signal.
pub async fn run(
    client: Client,
    config: &ControllerConfig,
    observer: Arc<dyn ReconcileObserver>,
    cancel: watch::Receiver<bool>,
    on_started: impl FnOnce(),
) -> Result<(), ControllerError> {
    let store: Arc<dyn ResourceStore> = Arc::new(KubeStore::new(client.clone()));
    let namespace = config.watch_namespace.as_deref();

    let (hello_worlds, pods): (Api<HelloWorld>, Api<Pod>) = match namespace {
        Some(ns) => (Api::namespaced(client.clone(), ns), Api::namespaced(client, ns)),
        None => (Api::all(client.clone()), Api::all(client)),
    };

    log_startup_summary(store.as_ref(), observer.as_ref(), namespace).await;

    let reconciler = Reconciler::new(
        Arc::clone(&store),
        Arc::clone(&observer),
        config.pull_secret_name.clone(),
        config.pull_secret_source_namespace.clone(),
    );
    let ctx = Arc::new(Context::new(reconciler, observer, cancel, config));
    let stream_ctx = Arc::clone(&ctx);

    info!(
        "Starting HelloWorld watch ({})",
        namespace.unwrap_or("all namespaces")
    );
    on_started();

    let pod_selector = format!("{APP_LABEL}={APP_LABEL_VALUE}");
    Controller::new(hello_worlds, watcher::Config::default())
        .owns(pods, watcher::Config::default().labels(&pod_selector))
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| {
            let ctx = Arc::clone(&stream_ctx);
            async move {
                match res {
                    Ok((obj, _action)) => debug!("Reconciled HelloWorld {}", obj),
                    Err(ControllerStreamError::ObjectNotFound(obj)) => {
                        debug!("HelloWorld {} is gone from the cache", obj);
                        ctx.forget(&obj);
                    }
                    Err(e) => warn!("Controller stream error: {}", e),
                }
            }
        })
        .await;

    info!("HelloWorld watch stopped");
    Ok(())
}
