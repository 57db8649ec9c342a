//! HelloWorld operations for MockStore

use super::{key, MockStore, Operation, WriteRecord};
use crate::error::StoreError;
use crds::{HelloWorld, HelloWorldStatus};

pub async fn get_hello_world(store: &MockStore, namespace: &str, name: &str) -> Result<HelloWorld, StoreError> {
    store.enter(Operation::GetHelloWorld).await?;
    store
        .hello_worlds
        .lock()
        .unwrap()
        .get(&key(namespace, name))
        .cloned()
        .ok_or_else(|| StoreError::NotFound(format!("helloworlds.apps.example.com \"{}\" not found", name)))
}

pub async fn list_hello_worlds(store: &MockStore, namespace: Option<&str>) -> Result<Vec<HelloWorld>, StoreError> {
    store.enter(Operation::ListHelloWorlds).await?;
    let mut items: Vec<HelloWorld> = store
        .hello_worlds
        .lock()
        .unwrap()
        .iter()
        .filter(|((ns, _), _)| namespace.is_none_or(|wanted| wanted == ns))
        .map(|(_, hello)| hello.clone())
        .collect();
    items.sort_by(|a, b| {
        (&a.metadata.namespace, &a.metadata.name).cmp(&(&b.metadata.namespace, &b.metadata.name))
    });
    Ok(items)
}

pub async fn update_status(
    store: &MockStore,
    namespace: &str,
    name: &str,
    resource_version: Option<&str>,
    status: &HelloWorldStatus,
) -> Result<HelloWorld, StoreError> {
    store.enter(Operation::UpdateStatus).await?;
    let next_rv = store.next_resource_version();
    let updated = {
        let mut hello_worlds = store.hello_worlds.lock().unwrap();
        let hello = hello_worlds
            .get_mut(&key(namespace, name))
            .ok_or_else(|| StoreError::NotFound(format!("helloworlds.apps.example.com \"{}\" not found", name)))?;

        if let Some(expected) = resource_version {
            if hello.metadata.resource_version.as_deref() != Some(expected) {
                return Err(StoreError::Conflict(format!(
                    "Operation cannot be fulfilled on helloworlds.apps.example.com \"{}\": the object has been modified; please apply your changes to the latest version and try again",
                    name
                )));
            }
        }

        hello.status = Some(status.clone());
        hello.metadata.resource_version = Some(next_rv);
        hello.clone()
    };

    store.record_write(WriteRecord::StatusUpdate {
        namespace: namespace.to_string(),
        name: name.to_string(),
        status: status.clone(),
    });
    Ok(updated)
}
