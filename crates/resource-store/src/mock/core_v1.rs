//! Core (v1) operations for MockStore
//!
//! Handles Pods and Secrets

use super::{key, MockStore, Operation, WriteRecord};
use crate::error::StoreError;
use k8s_openapi::api::core::v1::{Pod, PodStatus, Secret};

pub async fn get_pod(store: &MockStore, namespace: &str, name: &str) -> Result<Pod, StoreError> {
    store.enter(Operation::GetPod).await?;
    store
        .pods
        .lock()
        .unwrap()
        .get(&key(namespace, name))
        .cloned()
        .ok_or_else(|| StoreError::NotFound(format!("pods \"{}\" not found", name)))
}

pub async fn create_pod(store: &MockStore, namespace: &str, pod: &Pod) -> Result<Pod, StoreError> {
    store.enter(Operation::CreatePod).await?;
    let name = pod
        .metadata
        .name
        .clone()
        .ok_or_else(|| StoreError::Api("Pod \"\" is invalid: metadata.name: Required value".to_string()))?;

    let mut created = pod.clone();
    created.metadata.namespace = Some(namespace.to_string());
    created.metadata.uid = Some(uuid::Uuid::new_v4().to_string());
    created.metadata.resource_version = Some(store.next_resource_version());
    // The kubelet has not picked the Pod up yet
    created.status = Some(PodStatus {
        phase: Some("Pending".to_string()),
        ..Default::default()
    });

    {
        let mut pods = store.pods.lock().unwrap();
        let k = key(namespace, &name);
        if pods.contains_key(&k) {
            return Err(StoreError::AlreadyExists(format!("pods \"{}\" already exists", name)));
        }
        pods.insert(k, created.clone());
    }

    store.record_write(WriteRecord::PodCreated {
        namespace: namespace.to_string(),
        name,
    });
    Ok(created)
}

pub async fn get_secret(store: &MockStore, namespace: &str, name: &str) -> Result<Secret, StoreError> {
    store.enter(Operation::GetSecret).await?;
    store
        .secrets
        .lock()
        .unwrap()
        .get(&key(namespace, name))
        .cloned()
        .ok_or_else(|| StoreError::NotFound(format!("secrets \"{}\" not found", name)))
}

pub async fn create_secret(store: &MockStore, namespace: &str, secret: &Secret) -> Result<Secret, StoreError> {
    store.enter(Operation::CreateSecret).await?;
    let name = secret
        .metadata
        .name
        .clone()
        .ok_or_else(|| StoreError::Api("Secret \"\" is invalid: metadata.name: Required value".to_string()))?;

    let mut created = secret.clone();
    created.metadata.namespace = Some(namespace.to_string());
    created.metadata.uid = Some(uuid::Uuid::new_v4().to_string());
    created.metadata.resource_version = Some(store.next_resource_version());

    {
        let mut secrets = store.secrets.lock().unwrap();
        let k = key(namespace, &name);
        if secrets.contains_key(&k) {
            return Err(StoreError::AlreadyExists(format!("secrets \"{}\" already exists", name)));
        }
        secrets.insert(k, created.clone());
    }

    store.record_write(WriteRecord::SecretCreated {
        namespace: namespace.to_string(),
        name,
    });
    Ok(created)
}
