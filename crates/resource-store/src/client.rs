//! Kubernetes-backed resource store
//!
//! Thin wrapper over `kube::Api` that maps API errors onto [`StoreError`].

use crate::error::StoreError;
use crate::store_trait::ResourceStore;
use crds::{HelloWorld, HelloWorldStatus};
use k8s_openapi::api::core::v1::{Pod, Secret};
use kube::api::{ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client};
use tracing::debug;

/// Field manager recorded on objects written by the controller
pub const FIELD_MANAGER: &str = "hello-world-controller";

/// Resource store backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    /// Create a store from an existing Kubernetes client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Underlying Kubernetes client
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn hello_worlds(&self, namespace: &str) -> Api<HelloWorld> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

/// Builds the merge patch for a status write.
///
/// Including `metadata.resourceVersion` turns the patch into a conditional
/// write: the API server rejects it with 409 if the object changed since it
/// was read.
pub fn status_patch(
    resource_version: Option<&str>,
    status: &HelloWorldStatus,
) -> Result<serde_json::Value, StoreError> {
    let mut patch = serde_json::json!({
        "status": serde_json::to_value(status)?,
    });
    if let Some(rv) = resource_version {
        patch["metadata"] = serde_json::json!({ "resourceVersion": rv });
    }
    Ok(patch)
}

#[async_trait::async_trait]
impl ResourceStore for KubeStore {
    async fn get_hello_world(&self, namespace: &str, name: &str) -> Result<HelloWorld, StoreError> {
        debug!("GET HelloWorld {}/{}", namespace, name);
        Ok(self.hello_worlds(namespace).get(name).await?)
    }

    async fn list_hello_worlds(&self, namespace: Option<&str>) -> Result<Vec<HelloWorld>, StoreError> {
        let api: Api<HelloWorld> = match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn update_hello_world_status(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<&str>,
        status: &HelloWorldStatus,
    ) -> Result<HelloWorld, StoreError> {
        debug!(
            "PATCH HelloWorld {}/{} status (resourceVersion: {})",
            namespace,
            name,
            resource_version.unwrap_or("<unconditional>")
        );
        let patch = status_patch(resource_version, status)?;
        let pp = PatchParams::apply(FIELD_MANAGER);
        Ok(self
            .hello_worlds(namespace)
            .patch_status(name, &pp, &Patch::Merge(&patch))
            .await?)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, StoreError> {
        debug!("GET Pod {}/{}", namespace, name);
        Ok(self.pods(namespace).get(name).await?)
    }

    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<Pod, StoreError> {
        debug!("POST Pod {}/{}", namespace, pod.metadata.name.as_deref().unwrap_or("<unnamed>"));
        let pp = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        Ok(self.pods(namespace).create(&pp, pod).await?)
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, StoreError> {
        debug!("GET Secret {}/{}", namespace, name);
        Ok(self.secrets(namespace).get(name).await?)
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, StoreError> {
        debug!("POST Secret {}/{}", namespace, secret.metadata.name.as_deref().unwrap_or("<unnamed>"));
        let pp = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        Ok(self.secrets(namespace).create(&pp, secret).await?)
    }
}
