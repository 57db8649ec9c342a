//! Test utilities for unit testing the reconciler
//!
//! This module provides helpers for creating test data and a recording
//! observer that captures every telemetry call.

#[cfg(test)]
use crate::context::ReconcileContext;
#[cfg(test)]
use crate::observability::{Outcome, ReconcileObserver};
#[cfg(test)]
use crate::reconciler::{Reconciler, ResourceKey};
#[cfg(test)]
use crds::{HelloWorld, HelloWorldSpec};
#[cfg(test)]
use resource_store::MockStore;
#[cfg(test)]
use std::sync::{Arc, Mutex};
#[cfg(test)]
use std::time::Duration;

/// Pull secret name used by test reconcilers
#[cfg(test)]
pub const TEST_PULL_SECRET: &str = "regcred";

/// Source namespace used by test reconcilers
#[cfg(test)]
pub const TEST_SOURCE_NAMESPACE: &str = "hello-world-system";

/// Everything a [`RecordingObserver`] has seen
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct Recorded {
    pub outcomes: Vec<Outcome>,
    pub errors: u64,
    pub durations: Vec<f64>,
    pub pod_creations: Vec<String>,
    pub pod_creation_errors: Vec<String>,
    pub pull_secret_errors: Vec<String>,
    pub managed_resources: Vec<String>,
    pub requeues: Vec<String>,
}

/// Observer that records calls for assertions
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    recorded: Arc<Mutex<Recorded>>,
}

#[cfg(test)]
impl RecordingObserver {
    pub fn snapshot(&self) -> Recorded {
        self.recorded.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl ReconcileObserver for RecordingObserver {
    fn record_outcome(&self, outcome: Outcome) {
        self.recorded.lock().unwrap().outcomes.push(outcome);
    }

    fn record_error(&self) {
        self.recorded.lock().unwrap().errors += 1;
    }

    fn observe_duration(&self, seconds: f64) {
        self.recorded.lock().unwrap().durations.push(seconds);
    }

    fn record_pod_created(&self, namespace: &str) {
        self.recorded.lock().unwrap().pod_creations.push(namespace.to_string());
    }

    fn record_pod_creation_error(&self, namespace: &str) {
        self.recorded.lock().unwrap().pod_creation_errors.push(namespace.to_string());
    }

    fn record_pull_secret_error(&self, namespace: &str) {
        self.recorded.lock().unwrap().pull_secret_errors.push(namespace.to_string());
    }

    fn set_managed_resources(&self, namespace: &str, _count: i64) {
        self.recorded.lock().unwrap().managed_resources.push(namespace.to_string());
    }

    fn record_managed_resource(&self, namespace: &str) {
        self.recorded.lock().unwrap().managed_resources.push(namespace.to_string());
    }

    fn record_requeue(&self, reason: &str) {
        self.recorded.lock().unwrap().requeues.push(reason.to_string());
    }
}

/// Helper to create a test HelloWorld with uid and generation set
#[cfg(test)]
pub fn create_test_hello_world(name: &str, namespace: &str, message: &str) -> HelloWorld {
    let mut hello = HelloWorld::new(
        name,
        HelloWorldSpec {
            message: message.to_string(),
        },
    );
    hello.metadata.namespace = Some(namespace.to_string());
    hello.metadata.uid = Some(format!("uid-{namespace}-{name}"));
    hello.metadata.generation = Some(1);
    hello
}

/// Helper to create a reconciler over a mock store
#[cfg(test)]
pub fn create_test_reconciler(store: &MockStore) -> (Reconciler, RecordingObserver) {
    let observer = RecordingObserver::default();
    let reconciler = Reconciler::new(
        Arc::new(store.clone()),
        Arc::new(observer.clone()),
        TEST_PULL_SECRET,
        TEST_SOURCE_NAMESPACE,
    );
    (reconciler, observer)
}

/// Context that is never cancelled
#[cfg(test)]
pub fn test_context() -> ReconcileContext {
    ReconcileContext::detached(Duration::from_secs(5))
}

#[cfg(test)]
pub fn key(namespace: &str, name: &str) -> ResourceKey {
    ResourceKey::new(namespace, name)
}

/// Captures fields recorded on spans after creation, keyed by field name
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct SpanFieldRecorder {
    fields: Arc<Mutex<Vec<(String, String)>>>,
}

#[cfg(test)]
impl SpanFieldRecorder {
    /// Values recorded for `field`, in order
    pub fn values(&self, field: &str) -> Vec<String> {
        self.fields
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == field)
            .map(|(_, value)| value.clone())
            .collect()
    }
}

#[cfg(test)]
impl tracing::field::Visit for SpanFieldRecorder {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.fields.lock().unwrap().push((field.name().to_string(), value.to_string()));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.fields.lock().unwrap().push((field.name().to_string(), format!("{value:?}")));
    }
}

#[cfg(test)]
impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for SpanFieldRecorder {
    fn on_record(
        &self,
        _span: &tracing::span::Id,
        values: &tracing::span::Record<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = self.clone();
        values.record(&mut visitor);
    }
}
