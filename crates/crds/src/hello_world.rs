//! HelloWorld CRD
//!
//! Declares a message that the controller surfaces through a managed Pod.

use crate::condition::Condition;
use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// API group of the HelloWorld CRD
pub const API_GROUP: &str = "apps.example.com";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "apps.example.com",
    version = "v1",
    kind = "HelloWorld",
    plural = "helloworlds",
    shortname = "hw",
    namespaced,
    status = "HelloWorldStatus",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Pod","type":"string","jsonPath":".status.managedResourceName"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct HelloWorldSpec {
    /// Message printed by the managed Pod
    pub message: String,
}

/// Observed state of a HelloWorld, written only by the controller.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HelloWorldStatus {
    /// Current phase (absent until the first reconciliation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,

    /// Name of the Pod associated with this HelloWorld, empty if none
    #[serde(default)]
    pub managed_resource_name: String,

    /// Human-readable explanation of the current phase
    #[serde(default)]
    pub message: String,

    /// Generation of the HelloWorld this status reflects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Time of the last status write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<DateTime<Utc>>,

    /// Latest observations, unique by type, in insertion order
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl HelloWorldStatus {
    /// Whether this status reflects the given object generation.
    pub fn is_current(&self, generation: Option<i64>) -> bool {
        self.observed_generation.is_some() && self.observed_generation == generation
    }
}

/// Lifecycle phase of a HelloWorld
///
/// Serializes as PascalCase ("Running", "Failed", etc.) but also accepts
/// lowercase on read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum Phase {
    /// Pod is being created or is starting
    #[serde(alias = "pending")]
    Pending,

    /// Pod exists and is running (or was just created)
    #[serde(alias = "running")]
    Running,

    /// Pod creation failed or the Pod failed
    #[serde(alias = "failed")]
    Failed,

    /// Pod reports a phase the controller does not project
    #[serde(alias = "unknown")]
    Unknown,
}

impl Phase {
    /// String form used in logs and span attributes
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Pending => "Pending",
            Phase::Running => "Running",
            Phase::Failed => "Failed",
            Phase::Unknown => "Unknown",
        }
    }
}
