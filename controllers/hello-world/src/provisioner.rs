//! Image-pull secret provisioning
//!
//! Copies the pull secret from the controller's source namespace into each
//! workload namespace. Provisioning is best effort: the reconciler logs and
//! counts failures but never stops on them.

use crate::context::ReconcileContext;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use resource_store::{ResourceStore, StoreError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "hello-world-controller";

/// Result of a successful provisioning call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The secret already exists in the target namespace
    AlreadyPresent,
    /// There is nothing to copy from
    SourceMissing,
    /// The secret was copied (or a concurrent call copied it first)
    Copied,
}

/// Ensures the pull secret exists in workload namespaces
pub struct SecretProvisioner {
    store: Arc<dyn ResourceStore>,
    secret_name: String,
    source_namespace: String,
}

impl std::fmt::Debug for SecretProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretProvisioner")
            .field("secret_name", &self.secret_name)
            .field("source_namespace", &self.source_namespace)
            .finish_non_exhaustive()
    }
}

impl SecretProvisioner {
    pub fn new(store: Arc<dyn ResourceStore>, secret_name: impl Into<String>, source_namespace: impl Into<String>) -> Self {
        Self {
            store,
            secret_name: secret_name.into(),
            source_namespace: source_namespace.into(),
        }
    }

    /// Name of the secret being provisioned
    pub fn secret_name(&self) -> &str {
        &self.secret_name
    }

    /// Makes sure the pull secret exists in `namespace`.
    pub async fn ensure_secret(&self, namespace: &str, ctx: &ReconcileContext) -> Result<ProvisionOutcome, StoreError> {
        match ctx
            .run("get pull secret", self.store.get_secret(namespace, &self.secret_name))
            .await
        {
            Ok(_) => return Ok(ProvisionOutcome::AlreadyPresent),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        if namespace == self.source_namespace {
            debug!(
                "Pull secret {}/{} is absent from its source namespace",
                namespace, self.secret_name
            );
            return Ok(ProvisionOutcome::SourceMissing);
        }

        let source = match ctx
            .run(
                "get source pull secret",
                self.store.get_secret(&self.source_namespace, &self.secret_name),
            )
            .await
        {
            Ok(secret) => secret,
            Err(e) if e.is_not_found() => {
                debug!(
                    "Source pull secret {}/{} not found, nothing to copy",
                    self.source_namespace, self.secret_name
                );
                return Ok(ProvisionOutcome::SourceMissing);
            }
            Err(e) => return Err(e),
        };

        let copy = copy_secret(&source, &self.secret_name, namespace);
        match ctx
            .run("create pull secret", self.store.create_secret(namespace, &copy))
            .await
        {
            Ok(_) => {
                info!(
                    "Copied pull secret {} from {} to {}",
                    self.secret_name, self.source_namespace, namespace
                );
                Ok(ProvisionOutcome::Copied)
            }
            Err(e) if e.is_already_exists() => {
                debug!("Pull secret {}/{} was created concurrently", namespace, self.secret_name);
                Ok(ProvisionOutcome::Copied)
            }
            Err(e) => Err(e),
        }
    }
}

/// Copy of `source` for `namespace`: same type and payload, fresh metadata
fn copy_secret(source: &Secret, name: &str, namespace: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([(
                MANAGED_BY_LABEL.to_string(),
                MANAGED_BY_VALUE.to_string(),
            )])),
            ..Default::default()
        },
        type_: source.type_.clone(),
        data: source.data.clone(),
        string_data: source.string_data.clone(),
        immutable: source.immutable,
    }
}
