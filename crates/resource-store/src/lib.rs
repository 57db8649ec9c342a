//! Resource Store
//!
//! Typed access to the Kubernetes objects the HelloWorld controller works
//! with: `HelloWorld` (desired state and status), `Pod` (managed resource)
//! and `Secret` (image-pull credential).
//!
//! # Example
//!
//! ```no_run
//! use resource_store::{KubeStore, ResourceStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let store = KubeStore::new(client);
//!
//! let hello = store.get_hello_world("default", "demo").await?;
//! println!("message: {}", hello.spec.message);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Error taxonomy**: API failures mapped to `NotFound`, `AlreadyExists`,
//!   `Conflict`, `Forbidden`, `Transient`, ...
//! - **Optimistic concurrency**: status writes are conditional on the
//!   resourceVersion that was read
//! - **Mocking**: `MockStore` behind the `test-util` feature

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod store_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::KubeStore;
pub use error::StoreError;
pub use store_trait::ResourceStore;
#[cfg(feature = "test-util")]
pub use mock::{MockStore, Operation, WriteRecord};
