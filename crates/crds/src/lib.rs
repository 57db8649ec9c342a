//! HelloWorld CRD Definitions
//!
//! Kubernetes Custom Resource Definitions and status types for the
//! HelloWorld controller.

pub mod condition;
pub mod hello_world;

pub use condition::*;
pub use hello_world::*;
