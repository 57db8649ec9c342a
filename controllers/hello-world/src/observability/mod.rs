//! # Observability
//!
//! The reconciler reports what happened through [`ReconcileObserver`]. The
//! production implementation is [`ControllerMetrics`], which owns its own
//! Prometheus registry; tests use a recording implementation.

pub mod metrics;

pub use metrics::ControllerMetrics;

/// How a reconcile invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The HelloWorld no longer exists
    ResourceDeleted,
    /// The invocation returned an error
    Error,
    /// The managed Pod was created
    PodCreated,
    /// The managed Pod already existed and status was projected from it
    NoChange,
}

impl Outcome {
    /// Label value used for `result`
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::ResourceDeleted => "resource_deleted",
            Outcome::Error => "error",
            Outcome::PodCreated => "pod_created",
            Outcome::NoChange => "no_change",
        }
    }
}

/// Telemetry sink for reconcile invocations
pub trait ReconcileObserver: Send + Sync {
    /// One call per invocation with its final outcome
    fn record_outcome(&self, outcome: Outcome);

    /// Counted alongside `Outcome::Error`
    fn record_error(&self);

    /// Wall-clock duration of one invocation
    fn observe_duration(&self, seconds: f64);

    fn record_pod_created(&self, namespace: &str);

    fn record_pod_creation_error(&self, namespace: &str);

    /// Pull secret provisioning failed (reconciliation carried on)
    fn record_pull_secret_error(&self, namespace: &str);

    /// Number of HelloWorld resources known in `namespace`
    fn set_managed_resources(&self, namespace: &str, count: i64);

    /// A HelloWorld in `namespace` was observed with its Pod in place
    fn record_managed_resource(&self, namespace: &str);

    /// A requeue was scheduled for `reason`
    fn record_requeue(&self, reason: &str);
}
