//! # Controller Metrics
//!
//! Prometheus implementation of [`ReconcileObserver`].
//!
//! Metrics live in a registry owned by [`ControllerMetrics`] rather than a
//! process-wide one, so tests can create as many instances as they like.

use super::{Outcome, ReconcileObserver};
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

/// `controller` label value
pub const CONTROLLER_NAME: &str = "helloworld";

/// Prometheus metrics for the HelloWorld controller
#[derive(Clone)]
pub struct ControllerMetrics {
    registry: Registry,
    reconcile_total: IntCounterVec,
    reconcile_errors: IntCounterVec,
    reconcile_duration: HistogramVec,
    resources: IntGaugeVec,
    pod_creations: IntCounterVec,
    pod_creation_errors: IntCounterVec,
    pull_secret_errors: IntCounterVec,
    requeues_total: IntCounterVec,
}

impl std::fmt::Debug for ControllerMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerMetrics").finish_non_exhaustive()
    }
}

impl ControllerMetrics {
    /// Create all metrics and register them with a fresh registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let reconcile_total = IntCounterVec::new(
            Opts::new("helloworld_reconcile_total", "Total number of reconciliations by result"),
            &["controller", "result"],
        )?;
        let reconcile_errors = IntCounterVec::new(
            Opts::new("helloworld_reconcile_errors_total", "Total number of reconciliation errors"),
            &["controller"],
        )?;
        let reconcile_duration = HistogramVec::new(
            HistogramOpts::new(
                "helloworld_reconcile_duration_seconds",
                "Duration of reconciliation in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
            &["controller"],
        )?;
        let resources = IntGaugeVec::new(
            Opts::new("helloworld_resources", "Number of HelloWorld resources by namespace"),
            &["namespace"],
        )?;
        let pod_creations = IntCounterVec::new(
            Opts::new("helloworld_pod_creations_total", "Total number of Pods created"),
            &["namespace"],
        )?;
        let pod_creation_errors = IntCounterVec::new(
            Opts::new("helloworld_pod_creation_errors_total", "Total number of failed Pod creations"),
            &["namespace"],
        )?;
        let pull_secret_errors = IntCounterVec::new(
            Opts::new(
                "helloworld_pull_secret_errors_total",
                "Total number of failed image-pull secret provisioning attempts",
            ),
            &["namespace"],
        )?;
        let requeues_total = IntCounterVec::new(
            Opts::new("helloworld_requeues_total", "Total number of reconciliation requeues"),
            &["reason"],
        )?;

        registry.register(Box::new(reconcile_total.clone()))?;
        registry.register(Box::new(reconcile_errors.clone()))?;
        registry.register(Box::new(reconcile_duration.clone()))?;
        registry.register(Box::new(resources.clone()))?;
        registry.register(Box::new(pod_creations.clone()))?;
        registry.register(Box::new(pod_creation_errors.clone()))?;
        registry.register(Box::new(pull_secret_errors.clone()))?;
        registry.register(Box::new(requeues_total.clone()))?;

        Ok(Self {
            registry,
            reconcile_total,
            reconcile_errors,
            reconcile_duration,
            resources,
            pod_creations,
            pod_creation_errors,
            pull_secret_errors,
            requeues_total,
        })
    }

    /// Text exposition of all metrics
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl ReconcileObserver for ControllerMetrics {
    fn record_outcome(&self, outcome: Outcome) {
        self.reconcile_total
            .with_label_values(&[CONTROLLER_NAME, outcome.as_str()])
            .inc();
    }

    fn record_error(&self) {
        self.reconcile_errors.with_label_values(&[CONTROLLER_NAME]).inc();
    }

    fn observe_duration(&self, seconds: f64) {
        self.reconcile_duration
            .with_label_values(&[CONTROLLER_NAME])
            .observe(seconds);
    }

    fn record_pod_created(&self, namespace: &str) {
        self.pod_creations.with_label_values(&[namespace]).inc();
    }

    fn record_pod_creation_error(&self, namespace: &str) {
        self.pod_creation_errors.with_label_values(&[namespace]).inc();
    }

    fn record_pull_secret_error(&self, namespace: &str) {
        self.pull_secret_errors.with_label_values(&[namespace]).inc();
    }

    fn set_managed_resources(&self, namespace: &str, count: i64) {
        self.resources.with_label_values(&[namespace]).set(count);
    }

    fn record_managed_resource(&self, namespace: &str) {
        let gauge = self.resources.with_label_values(&[namespace]);
        if gauge.get() < 1 {
            gauge.set(1);
        }
    }

    fn record_requeue(&self, reason: &str) {
        self.requeues_total.with_label_values(&[reason]).inc();
    }
}
