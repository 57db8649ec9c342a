//! Behaviour tests for MockStore
//!
//! The reconciler tests rely on the mock mirroring the API server for the
//! calls it makes, so the semantics that matter are pinned down here.

use crds::{HelloWorld, HelloWorldSpec, HelloWorldStatus, Phase};
use k8s_openapi::api::core::v1::{Pod, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use resource_store::{MockStore, Operation, ResourceStore, StoreError, WriteRecord};
use std::time::Duration;

fn hello_world(name: &str, namespace: &str) -> HelloWorld {
    let mut hello = HelloWorld::new(
        name,
        HelloWorldSpec {
            message: "hi".to_string(),
        },
    );
    hello.metadata.namespace = Some(namespace.to_string());
    hello
}

fn pod(name: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn test_get_missing_hello_world_is_not_found() {
    let store = MockStore::new();
    let err = store.get_hello_world("default", "nope").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_list_filters_by_namespace() {
    let store = MockStore::new();
    store.add_hello_world(hello_world("a", "team-a"));
    store.add_hello_world(hello_world("b", "team-b"));
    store.add_hello_world(hello_world("c", "team-a"));

    let all = store.list_hello_worlds(None).await.unwrap();
    assert_eq!(all.len(), 3);

    let team_a = store.list_hello_worlds(Some("team-a")).await.unwrap();
    let names: Vec<_> = team_a.iter().filter_map(|h| h.metadata.name.clone()).collect();
    assert_eq!(names, vec!["a".to_string(), "c".to_string()]);
}

#[tokio::test]
async fn test_status_update_bumps_resource_version() {
    let store = MockStore::new();
    store.add_hello_world(hello_world("demo", "default"));
    let before = store.get_hello_world("default", "demo").await.unwrap();
    let rv = before.metadata.resource_version.clone();

    let status = HelloWorldStatus {
        phase: Some(Phase::Pending),
        ..Default::default()
    };
    let updated = store
        .update_hello_world_status("default", "demo", rv.as_deref(), &status)
        .await
        .unwrap();

    assert_ne!(updated.metadata.resource_version, rv);
    assert_eq!(updated.status, Some(status.clone()));
    assert_eq!(store.status_history("default", "demo"), vec![status]);
}

#[tokio::test]
async fn test_stale_status_update_conflicts() {
    let store = MockStore::new();
    store.add_hello_world(hello_world("demo", "default"));
    let read = store.get_hello_world("default", "demo").await.unwrap();

    store.touch_hello_world("default", "demo");

    let err = store
        .update_hello_world_status(
            "default",
            "demo",
            read.metadata.resource_version.as_deref(),
            &HelloWorldStatus::default(),
        )
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn test_create_pod_twice_is_already_exists() {
    let store = MockStore::new();
    let created = store.create_pod("default", &pod("demo-pod")).await.unwrap();
    assert_eq!(created.metadata.namespace.as_deref(), Some("default"));
    assert!(created.metadata.uid.is_some());
    assert_eq!(
        created.status.and_then(|s| s.phase).as_deref(),
        Some("Pending")
    );

    let err = store.create_pod("default", &pod("demo-pod")).await.unwrap_err();
    assert!(err.is_already_exists());
    assert_eq!(store.pod_count(), 1);
}

#[tokio::test]
async fn test_create_secret_records_write() {
    let store = MockStore::new();
    let secret = Secret {
        metadata: ObjectMeta {
            name: Some("regcred".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    store.create_secret("apps", &secret).await.unwrap();

    assert!(store.secret("apps", "regcred").is_some());
    assert_eq!(
        store.writes(),
        vec![WriteRecord::SecretCreated {
            namespace: "apps".to_string(),
            name: "regcred".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_injected_fault_is_returned_until_cleared() {
    let store = MockStore::new();
    store.fail(Operation::GetPod, StoreError::Transient("connection reset".to_string()));

    let err = store.get_pod("default", "demo-pod").await.unwrap_err();
    assert_eq!(err, StoreError::Transient("connection reset".to_string()));

    store.clear_fault(Operation::GetPod);
    let err = store.get_pod("default", "demo-pod").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(store.calls(), vec![Operation::GetPod, Operation::GetPod]);
}

#[tokio::test(start_paused = true)]
async fn test_latency_delays_calls() {
    let store = MockStore::new();
    store.set_latency(Duration::from_secs(10));

    let started = tokio::time::Instant::now();
    let _ = store.get_secret("default", "regcred").await;
    assert!(started.elapsed() >= Duration::from_secs(10));
}
