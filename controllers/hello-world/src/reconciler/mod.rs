//! Reconciliation logic for HelloWorld resources.
//!
//! One invocation reads the HelloWorld and its Pod, takes at most one action
//! (create the Pod) and records the result in status conditions. It is safe
//! to run any number of times for the same key: the Pod is found by its
//! deterministic name, creation tolerates `AlreadyExists` and status writes
//! are conditional on the resourceVersion that was read.
//!
//! - `status`: condition draft and conditional status writes

mod status;

use crate::builder::{build_pod, pod_name};
use crate::conditions::is_condition_status;
use crate::context::ReconcileContext;
use crate::error::ControllerError;
use crate::observability::{Outcome, ReconcileObserver};
use crate::provisioner::SecretProvisioner;
use crds::{ConditionStatus, ConditionType, HelloWorld, Phase};
use k8s_openapi::api::core::v1::Pod;
use kube::Resource;
use resource_store::ResourceStore;
use status::StatusTracker;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, field, info, info_span, warn, Instrument, Span};

/// Namespace and name of a HelloWorld
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a watched object; fails when name or namespace is missing
    pub fn from_object(hello: &HelloWorld) -> Result<Self, ControllerError> {
        let name = hello
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| ControllerError::InvalidObject("HelloWorld without metadata.name".to_string()))?;
        let namespace = hello.metadata.namespace.as_deref().ok_or_else(|| {
            ControllerError::InvalidObject(format!("HelloWorld {name} without metadata.namespace"))
        })?;
        Ok(Self::new(namespace, name))
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// What the caller should do after a successful invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    /// Re-run soon: convergence is still in progress
    pub requeue: bool,
}

impl ReconcileResult {
    fn done() -> Self {
        Self { requeue: false }
    }

    fn requeue() -> Self {
        Self { requeue: true }
    }
}

/// Converges HelloWorld resources into Pods.
pub struct Reconciler {
    store: Arc<dyn ResourceStore>,
    observer: Arc<dyn ReconcileObserver>,
    provisioner: SecretProvisioner,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("provisioner", &self.provisioner)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        store: Arc<dyn ResourceStore>,
        observer: Arc<dyn ReconcileObserver>,
        pull_secret_name: impl Into<String>,
        pull_secret_source_namespace: impl Into<String>,
    ) -> Self {
        let provisioner = SecretProvisioner::new(
            Arc::clone(&store),
            pull_secret_name,
            pull_secret_source_namespace,
        );
        Self {
            store,
            observer,
            provisioner,
        }
    }

    /// Reconciles the HelloWorld identified by `key`.
    ///
    /// Every exit path records exactly one outcome and one duration sample.
    pub async fn reconcile(&self, key: &ResourceKey, ctx: &ReconcileContext) -> Result<ReconcileResult, ControllerError> {
        let span = info_span!(
            "reconcile",
            resource.name = %key.name,
            resource.namespace = %key.namespace,
            hello_world.message = field::Empty,
            hello_world.uid = field::Empty,
            reconcile.result = field::Empty,
            reconcile.duration_seconds = field::Empty,
            otel.status_code = field::Empty,
            error = field::Empty,
        );

        let start = Instant::now();
        let result = self.converge(key, ctx, &span).instrument(span.clone()).await;
        let duration = start.elapsed().as_secs_f64();

        self.observer.observe_duration(duration);
        span.record("reconcile.duration_seconds", duration);
        span.record("otel.status_code", if result.is_ok() { "OK" } else { "ERROR" });
        if let Err(e) = &result {
            span.record("error", e.to_string().as_str());
        }
        result
    }

    async fn converge(&self, key: &ResourceKey, ctx: &ReconcileContext, span: &Span) -> Result<ReconcileResult, ControllerError> {
        let hello = match ctx
            .run("get HelloWorld", self.store.get_hello_world(&key.namespace, &key.name))
            .await
        {
            Ok(hello) => hello,
            Err(e) if e.is_not_found() => {
                debug!("HelloWorld {} not found, ignoring since it must have been deleted", key);
                self.finish(span, Outcome::ResourceDeleted);
                return Ok(ReconcileResult::done());
            }
            Err(e) => {
                error!("Failed to get HelloWorld {}: {}", key, e);
                self.finish(span, Outcome::Error);
                return Err(e.into());
            }
        };

        span.record("hello_world.message", hello.spec.message.as_str());
        span.record("hello_world.uid", hello.metadata.uid.as_deref().unwrap_or_default());

        self.provision_pull_secret(&key.namespace, ctx).await;

        let mut status = StatusTracker::for_object(&hello, &key.namespace, &key.name);
        let pod = match self.desired_pod(&hello, key) {
            Ok(pod) => pod,
            Err(e) => {
                error!("Failed to set controller reference on Pod for {}: {}", key, e);
                status.set(ConditionType::Ready, ConditionStatus::False, "OwnerReferenceFailed", &e.to_string());
                status.set(ConditionType::Progressing, ConditionStatus::False, "OwnerReferenceFailed", &e.to_string());
                if let Err(write_err) = status
                    .persist(self.store.as_ref(), ctx, Phase::Failed, "", &e.to_string())
                    .await
                {
                    warn!("Failed to record owner reference failure for {}: {}", key, write_err);
                }
                self.finish(span, Outcome::Error);
                return Err(e);
            }
        };

        let name = pod_name(&key.name);
        match ctx
            .run("get Pod", self.store.get_pod(&key.namespace, &name))
            .await
        {
            Ok(found) => self.observe_pod(key, ctx, span, &found, status).await,
            Err(e) if e.is_not_found() => self.create_pod(key, ctx, span, &pod, status).await,
            Err(e) => {
                error!("Failed to get Pod {}/{} ({}): {}", key.namespace, name, e.kind(), e);
                self.finish(span, Outcome::Error);
                Err(e.into())
            }
        }
    }

    /// Desired Pod with the HelloWorld as controlling owner
    fn desired_pod(&self, hello: &HelloWorld, key: &ResourceKey) -> Result<Pod, ControllerError> {
        let mut pod = build_pod(
            &key.name,
            &key.namespace,
            &hello.spec,
            Some(self.provisioner.secret_name()),
        );
        let owner = hello.controller_owner_ref(&()).ok_or_else(|| {
            ControllerError::OwnerReference(format!("HelloWorld {key} has no uid yet"))
        })?;
        pod.metadata.owner_references = Some(vec![owner]);
        Ok(pod)
    }

    /// Best effort: failures are logged and counted, never returned
    async fn provision_pull_secret(&self, namespace: &str, ctx: &ReconcileContext) {
        match self.provisioner.ensure_secret(namespace, ctx).await {
            Ok(outcome) => debug!("Pull secret in {}: {:?}", namespace, outcome),
            Err(e) if e.is_cancelled() => debug!("Pull secret provisioning in {} cancelled", namespace),
            Err(e) => {
                warn!(
                    "Failed to provision pull secret {} in {} ({}), continuing: {}",
                    self.provisioner.secret_name(),
                    namespace,
                    e.kind(),
                    e
                );
                self.observer.record_pull_secret_error(namespace);
            }
        }
    }

    async fn create_pod(
        &self,
        key: &ResourceKey,
        ctx: &ReconcileContext,
        span: &Span,
        pod: &Pod,
        mut status: StatusTracker,
    ) -> Result<ReconcileResult, ControllerError> {
        let name = pod_name(&key.name);
        let store = self.store.as_ref();

        status.set(ConditionType::Progressing, ConditionStatus::True, "Creating", "Creating Pod");
        status.set(ConditionType::Ready, ConditionStatus::False, "PodBeingCreated", "Pod is being created");
        if let Err(e) = status
            .persist(store, ctx, Phase::Pending, "", "Creating Pod")
            .await
        {
            error!("Failed to update status of HelloWorld {}: {}", key, e);
            self.finish(span, Outcome::Error);
            return Err(e);
        }

        info!("Creating a new Pod {}/{}", key.namespace, name);
        let create_span = info_span!("create_pod", pod.name = %name, pod.namespace = %key.namespace);
        let created = ctx
            .run("create Pod", store.create_pod(&key.namespace, pod))
            .instrument(create_span)
            .await;

        match created {
            Err(e) if e.is_cancelled() => {
                debug!("Creation of Pod {}/{} cancelled", key.namespace, name);
                self.finish(span, Outcome::Error);
                Err(e.into())
            }
            Err(e) if !e.is_already_exists() => {
                error!("Failed to create new Pod {}/{}: {}", key.namespace, name, e);
                self.observer.record_pod_creation_error(&key.namespace);

                let message = format!("Failed to create Pod: {e}");
                status.set(ConditionType::Ready, ConditionStatus::False, "PodCreationFailed", &message);
                status.set(ConditionType::Progressing, ConditionStatus::False, "PodCreationFailed", &message);
                status.set(ConditionType::Degraded, ConditionStatus::True, "PodCreationFailed", &message);
                if let Err(write_err) = status.persist(store, ctx, Phase::Failed, "", &message).await {
                    warn!("Failed to record Pod creation failure for {}: {}", key, write_err);
                }

                self.finish(span, Outcome::Error);
                Err(e.into())
            }
            result => {
                if result.is_err() {
                    debug!("Pod {}/{} already exists, created by a concurrent reconcile", key.namespace, name);
                } else {
                    info!("Pod {}/{} created successfully", key.namespace, name);
                    self.observer.record_pod_created(&key.namespace);
                }

                status.set(ConditionType::Progressing, ConditionStatus::True, "Created", "Pod created");
                status.set(ConditionType::Ready, ConditionStatus::False, "Starting", "Pod is starting");
                if is_condition_status(status.conditions(), ConditionType::Degraded, ConditionStatus::True) {
                    status.set(ConditionType::Degraded, ConditionStatus::False, "Created", "Pod created");
                }
                if let Err(e) = status
                    .persist(store, ctx, Phase::Running, &name, "Pod created")
                    .await
                {
                    error!("Failed to update status of HelloWorld {}: {}", key, e);
                    self.finish(span, Outcome::Error);
                    return Err(e);
                }

                self.finish(span, Outcome::PodCreated);
                Ok(ReconcileResult::requeue())
            }
        }
    }

    /// Projects the phase of an existing Pod onto status; the Pod itself is never changed.
    async fn observe_pod(
        &self,
        key: &ResourceKey,
        ctx: &ReconcileContext,
        span: &Span,
        pod: &Pod,
        mut status: StatusTracker,
    ) -> Result<ReconcileResult, ControllerError> {
        let name = pod_name(&key.name);
        let pod_phase = pod
            .status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .unwrap_or_default();
        debug!("Pod {}/{} already exists (phase: {:?})", key.namespace, name, pod_phase);

        let phase = match pod_phase {
            "Running" => {
                status.set(ConditionType::Ready, ConditionStatus::True, "PodRunning", "Pod is running");
                status.set(ConditionType::Progressing, ConditionStatus::False, "PodRunning", "Pod is running");
                status.set(ConditionType::Degraded, ConditionStatus::False, "PodRunning", "Pod is running");
                Phase::Running
            }
            "Pending" => {
                status.set(ConditionType::Ready, ConditionStatus::False, "PodPending", "Pod is pending");
                status.set(ConditionType::Progressing, ConditionStatus::True, "PodPending", "Pod is pending");
                Phase::Pending
            }
            "Failed" => {
                status.set(ConditionType::Ready, ConditionStatus::False, "PodFailed", "Pod has failed");
                status.set(ConditionType::Progressing, ConditionStatus::False, "PodFailed", "Pod has failed");
                status.set(ConditionType::Degraded, ConditionStatus::True, "PodFailed", "Pod has failed");
                Phase::Failed
            }
            other => {
                let message = format!("Pod reports phase {other:?}");
                status.set(ConditionType::Ready, ConditionStatus::Unknown, "PodPhaseUnknown", &message);
                Phase::Unknown
            }
        };

        let was_ready = is_condition_status(status.persisted_conditions(), ConditionType::Ready, ConditionStatus::True);
        let message = format!("Pod {name} is {}", phase.as_str());
        if let Err(e) = status
            .persist(self.store.as_ref(), ctx, phase, &name, &message)
            .await
        {
            error!("Failed to update status of HelloWorld {}: {}", key, e);
            self.finish(span, Outcome::Error);
            return Err(e);
        }

        if !was_ready && is_condition_status(status.conditions(), ConditionType::Ready, ConditionStatus::True) {
            info!("HelloWorld {} is ready", key);
        }

        self.observer.record_managed_resource(&key.namespace);
        self.finish(span, Outcome::NoChange);
        Ok(ReconcileResult::done())
    }

    fn finish(&self, span: &Span, outcome: Outcome) {
        span.record("reconcile.result", outcome.as_str());
        self.observer.record_outcome(outcome);
        if outcome == Outcome::Error {
            self.observer.record_error();
        }
    }
}
