//! Mock ResourceStore for unit testing
//!
//! This module provides an in-memory implementation of `ResourceStore` that
//! can be used in unit tests without a running cluster.
//!
//! The mock is organized by API group:
//! - `hello_world.rs` - HelloWorld reads and status writes
//! - `core_v1.rs` - Pods and Secrets
//!
//! Besides storage it offers fault injection per [`Operation`], artificial
//! latency (to exercise timeouts and cancellation) and a log of every write.

mod core_v1;
mod hello_world;

use crate::error::StoreError;
use crate::store_trait::ResourceStore;
use crds::{HelloWorld, HelloWorldStatus};
use k8s_openapi::api::core::v1::{Pod, PodStatus, Secret};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) type ObjectKey = (String, String);

pub(crate) fn key(namespace: &str, name: &str) -> ObjectKey {
    (namespace.to_string(), name.to_string())
}

/// Store operations that can be observed or made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetHelloWorld,
    ListHelloWorlds,
    UpdateStatus,
    GetPod,
    CreatePod,
    GetSecret,
    CreateSecret,
}

/// A mutation performed through the mock
#[derive(Debug, Clone, PartialEq)]
pub enum WriteRecord {
    StatusUpdate {
        namespace: String,
        name: String,
        status: HelloWorldStatus,
    },
    PodCreated {
        namespace: String,
        name: String,
    },
    SecretCreated {
        namespace: String,
        name: String,
    },
}

/// In-memory ResourceStore
///
/// Cloning shares the underlying state, so a test can keep a handle for
/// assertions while the reconciler owns another.
#[derive(Clone, Default)]
pub struct MockStore {
    pub(crate) hello_worlds: Arc<Mutex<HashMap<ObjectKey, HelloWorld>>>,
    pub(crate) pods: Arc<Mutex<HashMap<ObjectKey, Pod>>>,
    pub(crate) secrets: Arc<Mutex<HashMap<ObjectKey, Secret>>>,
    faults: Arc<Mutex<HashMap<Operation, StoreError>>>,
    writes: Arc<Mutex<Vec<WriteRecord>>>,
    calls: Arc<Mutex<Vec<Operation>>>,
    latency: Arc<Mutex<Option<Duration>>>,
    // Counter for generating resource versions
    next_resource_version: Arc<Mutex<u64>>,
}

impl std::fmt::Debug for MockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStore").finish_non_exhaustive()
    }
}

impl MockStore {
    /// Create an empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a HelloWorld (for test setup)
    ///
    /// Fills in `resourceVersion` and `generation` when missing. The uid is
    /// left as given so tests can exercise objects without one.
    pub fn add_hello_world(&self, mut hello: HelloWorld) {
        if hello.metadata.resource_version.is_none() {
            hello.metadata.resource_version = Some(self.next_resource_version());
        }
        if hello.metadata.generation.is_none() {
            hello.metadata.generation = Some(1);
        }
        let k = key(
            hello.metadata.namespace.as_deref().unwrap_or("default"),
            hello.metadata.name.as_deref().unwrap_or_default(),
        );
        self.hello_worlds.lock().unwrap().insert(k, hello);
    }

    /// Remove a HelloWorld, as if it was deleted by a user
    pub fn remove_hello_world(&self, namespace: &str, name: &str) -> Option<HelloWorld> {
        self.hello_worlds.lock().unwrap().remove(&key(namespace, name))
    }

    /// Current stored HelloWorld
    pub fn hello_world(&self, namespace: &str, name: &str) -> Option<HelloWorld> {
        self.hello_worlds.lock().unwrap().get(&key(namespace, name)).cloned()
    }

    /// Simulate an unrelated write (e.g. a label change) by bumping the resourceVersion
    pub fn touch_hello_world(&self, namespace: &str, name: &str) {
        let rv = self.next_resource_version();
        if let Some(hello) = self.hello_worlds.lock().unwrap().get_mut(&key(namespace, name)) {
            hello.metadata.resource_version = Some(rv);
        }
    }

    /// Add a Pod (for test setup)
    pub fn add_pod(&self, pod: Pod) {
        let k = key(
            pod.metadata.namespace.as_deref().unwrap_or("default"),
            pod.metadata.name.as_deref().unwrap_or_default(),
        );
        self.pods.lock().unwrap().insert(k, pod);
    }

    /// Current stored Pod
    pub fn pod(&self, namespace: &str, name: &str) -> Option<Pod> {
        self.pods.lock().unwrap().get(&key(namespace, name)).cloned()
    }

    /// Number of stored Pods across all namespaces
    pub fn pod_count(&self) -> usize {
        self.pods.lock().unwrap().len()
    }

    /// Set `status.phase` of a stored Pod, as the kubelet would
    pub fn set_pod_phase(&self, namespace: &str, name: &str, phase: &str) {
        if let Some(pod) = self.pods.lock().unwrap().get_mut(&key(namespace, name)) {
            pod.status = Some(PodStatus {
                phase: Some(phase.to_string()),
                ..Default::default()
            });
        }
    }

    /// Add a Secret (for test setup)
    pub fn add_secret(&self, secret: Secret) {
        let k = key(
            secret.metadata.namespace.as_deref().unwrap_or("default"),
            secret.metadata.name.as_deref().unwrap_or_default(),
        );
        self.secrets.lock().unwrap().insert(k, secret);
    }

    /// Current stored Secret
    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.secrets.lock().unwrap().get(&key(namespace, name)).cloned()
    }

    /// Make every call of `operation` fail with `error` until cleared
    pub fn fail(&self, operation: Operation, error: StoreError) {
        self.faults.lock().unwrap().insert(operation, error);
    }

    /// Stop failing `operation`
    pub fn clear_fault(&self, operation: Operation) {
        self.faults.lock().unwrap().remove(&operation);
    }

    /// Delay every call by `latency` before it touches the store
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    /// All writes performed so far, in order
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.writes.lock().unwrap().clone()
    }

    /// Status values written for one HelloWorld, in order
    pub fn status_history(&self, namespace: &str, name: &str) -> Vec<HelloWorldStatus> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter_map(|w| match w {
                WriteRecord::StatusUpdate { namespace: ns, name: n, status } if ns == namespace && n == name => {
                    Some(status.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// All operations invoked so far, in order (including failed ones)
    pub fn calls(&self) -> Vec<Operation> {
        self.calls.lock().unwrap().clone()
    }

    /// Generate next resource version
    pub(crate) fn next_resource_version(&self) -> String {
        let mut rv = self.next_resource_version.lock().unwrap();
        *rv += 1;
        rv.to_string()
    }

    pub(crate) fn record_write(&self, write: WriteRecord) {
        self.writes.lock().unwrap().push(write);
    }

    /// Applies latency, records the call and returns the injected fault, if any.
    pub(crate) async fn enter(&self, operation: Operation) -> Result<(), StoreError> {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.calls.lock().unwrap().push(operation);
        match self.faults.lock().unwrap().get(&operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl ResourceStore for MockStore {
    // HelloWorld operations - delegated to hello_world module
    async fn get_hello_world(&self, namespace: &str, name: &str) -> Result<HelloWorld, StoreError> {
        hello_world::get_hello_world(self, namespace, name).await
    }

    async fn list_hello_worlds(&self, namespace: Option<&str>) -> Result<Vec<HelloWorld>, StoreError> {
        hello_world::list_hello_worlds(self, namespace).await
    }

    async fn update_hello_world_status(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<&str>,
        status: &HelloWorldStatus,
    ) -> Result<HelloWorld, StoreError> {
        hello_world::update_status(self, namespace, name, resource_version, status).await
    }

    // Core operations - delegated to core_v1 module
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, StoreError> {
        core_v1::get_pod(self, namespace, name).await
    }

    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<Pod, StoreError> {
        core_v1::create_pod(self, namespace, pod).await
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, StoreError> {
        core_v1::get_secret(self, namespace, name).await
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, StoreError> {
        core_v1::create_secret(self, namespace, secret).await
    }
}
