//! Status bookkeeping for a single reconcile invocation
//!
//! Conditions are computed into a draft; `persist` writes the draft with the
//! resourceVersion of the last read or write as precondition.

use crate::conditions::{set_condition, ConditionUpdate};
use crate::context::ReconcileContext;
use crate::error::ControllerError;
use chrono::Utc;
use crds::{Condition, ConditionStatus, ConditionType, HelloWorld, HelloWorldStatus, Phase};
use resource_store::ResourceStore;
use tracing::debug;

pub(crate) struct StatusTracker {
    namespace: String,
    name: String,
    generation: Option<i64>,
    resource_version: Option<String>,
    persisted: HelloWorldStatus,
    draft: HelloWorldStatus,
}

impl StatusTracker {
    pub(crate) fn for_object(hello: &HelloWorld, namespace: &str, name: &str) -> Self {
        let persisted = hello.status.clone().unwrap_or_default();
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            generation: hello.metadata.generation,
            resource_version: hello.metadata.resource_version.clone(),
            draft: persisted.clone(),
            persisted,
        }
    }

    /// Set a condition on the draft
    pub(crate) fn set(&mut self, type_: ConditionType, status: ConditionStatus, reason: &str, message: &str) {
        let update = ConditionUpdate::new(type_, status, reason, message).with_generation(self.generation);
        self.draft.conditions = set_condition(&self.draft.conditions, update, Utc::now());
    }

    pub(crate) fn conditions(&self) -> &[Condition] {
        &self.draft.conditions
    }

    pub(crate) fn persisted_conditions(&self) -> &[Condition] {
        &self.persisted.conditions
    }

    /// Writes the draft with the given phase fields.
    ///
    /// Returns `false` without calling the store when nothing but the update
    /// timestamp would change.
    pub(crate) async fn persist(
        &mut self,
        store: &dyn ResourceStore,
        ctx: &ReconcileContext,
        phase: Phase,
        managed_resource_name: &str,
        message: &str,
    ) -> Result<bool, ControllerError> {
        self.draft.phase = Some(phase);
        self.draft.managed_resource_name = managed_resource_name.to_string();
        self.draft.message = message.to_string();
        self.draft.observed_generation = self.generation;

        if !status_needs_update(&self.persisted, &self.draft) {
            debug!(
                "Status of HelloWorld {}/{} unchanged ({}), skipping write",
                self.namespace,
                self.name,
                phase.as_str()
            );
            return Ok(false);
        }

        self.draft.last_update_time = Some(Utc::now());
        let updated = ctx
            .run(
                "update HelloWorld status",
                store.update_hello_world_status(
                    &self.namespace,
                    &self.name,
                    self.resource_version.as_deref(),
                    &self.draft,
                ),
            )
            .await?;

        self.resource_version = updated.metadata.resource_version;
        self.persisted = self.draft.clone();
        Ok(true)
    }
}

/// Whether `desired` differs from `current` in anything but `lastUpdateTime`
pub(crate) fn status_needs_update(current: &HelloWorldStatus, desired: &HelloWorldStatus) -> bool {
    current.phase != desired.phase
        || current.managed_resource_name != desired.managed_resource_name
        || current.message != desired.message
        || current.observed_generation != desired.observed_generation
        || current.conditions != desired.conditions
}
