//! ResourceStore trait for mocking
//!
//! This trait abstracts the Kubernetes API so the reconciler can be unit
//! tested. `KubeStore` implements it against a live cluster and
//! `MockStore` (feature `test-util`) keeps everything in memory.

use crate::error::StoreError;
use crds::{HelloWorld, HelloWorldStatus};
use k8s_openapi::api::core::v1::{Pod, Secret};

/// Typed access to the objects the HelloWorld controller reads and writes.
///
/// All methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ResourceStore: Send + Sync {
    // HelloWorld operations
    async fn get_hello_world(&self, namespace: &str, name: &str) -> Result<HelloWorld, StoreError>;
    async fn list_hello_worlds(&self, namespace: Option<&str>) -> Result<Vec<HelloWorld>, StoreError>;

    /// Writes the status subresource.
    ///
    /// When `resource_version` is set the write only succeeds if the stored
    /// object still has that version, otherwise `StoreError::Conflict`.
    async fn update_hello_world_status(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<&str>,
        status: &HelloWorldStatus,
    ) -> Result<HelloWorld, StoreError>;

    // Core operations
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, StoreError>;
    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<Pod, StoreError>;
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, StoreError>;
    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, StoreError>;
}
