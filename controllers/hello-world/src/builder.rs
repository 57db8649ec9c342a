//! Desired Pod for a HelloWorld
//!
//! The builder is pure: the same inputs always produce the same manifest.

use crds::HelloWorldSpec;
use k8s_openapi::api::core::v1::{Container, LocalObjectReference, Pod, PodSpec, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

pub const CONTAINER_NAME: &str = "busybox";
pub const CONTAINER_IMAGE: &str = "busybox:latest";
pub const APP_LABEL: &str = "app";
pub const APP_LABEL_VALUE: &str = "helloworld";
pub const INSTANCE_LABEL: &str = "helloworld";

/// Name of the Pod managed for the HelloWorld `name`
pub fn pod_name(name: &str) -> String {
    format!("{name}-pod")
}

/// Builds the Pod that should exist for a HelloWorld.
///
/// `pull_secret` adds an `imagePullSecrets` entry; the kubelet tolerates a
/// missing secret for public images.
pub fn build_pod(name: &str, namespace: &str, spec: &HelloWorldSpec, pull_secret: Option<&str>) -> Pod {
    let labels = BTreeMap::from([
        (APP_LABEL.to_string(), APP_LABEL_VALUE.to_string()),
        (INSTANCE_LABEL.to_string(), name.to_string()),
    ]);

    Pod {
        metadata: ObjectMeta {
            name: Some(pod_name(name)),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: CONTAINER_NAME.to_string(),
                image: Some(CONTAINER_IMAGE.to_string()),
                command: Some(vec!["sh".to_string(), "-c".to_string()]),
                args: Some(vec![echo_command(&spec.message)]),
                resources: Some(ResourceRequirements {
                    requests: Some(quantities("50m", "64Mi")),
                    limits: Some(quantities("100m", "128Mi")),
                    ..Default::default()
                }),
                ..Default::default()
            }],
            restart_policy: Some("Always".to_string()),
            image_pull_secrets: pull_secret.map(|secret| {
                vec![LocalObjectReference {
                    name: secret.to_string(),
                }]
            }),
            ..Default::default()
        }),
        status: None,
    }
}

/// Shell command printing `message` and then idling
fn echo_command(message: &str) -> String {
    // Close, escape and reopen the single-quoted string around embedded quotes
    let quoted = message.replace('\'', r"'\''");
    format!("echo '{quoted}' && sleep 3600")
}

fn quantities(cpu: &str, memory: &str) -> BTreeMap<String, Quantity> {
    BTreeMap::from([
        ("cpu".to_string(), Quantity(cpu.to_string())),
        ("memory".to_string(), Quantity(memory.to_string())),
    ])
}
