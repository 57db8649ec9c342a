//! Controller-specific error types.
//!
//! Store failures arrive as [`StoreError`] and are wrapped here; everything
//! the reconciler returns ends up in the error policy, which decides the
//! backoff.

use resource_store::StoreError;
use thiserror::Error;

/// Errors that can occur in the HelloWorld Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Resource store error
    #[error("Resource store error: {0}")]
    Store(StoreError),

    /// Status write lost the optimistic concurrency check
    #[error("Status conflict: {0}")]
    Conflict(String),

    /// Controller owner reference could not be built
    #[error("Owner reference error: {0}")]
    OwnerReference(String),

    /// The object delivered by the watch is missing required metadata
    #[error("Invalid object: {0}")]
    InvalidObject(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Metrics/probe server failed
    #[error("Server error: {0}")]
    Server(String),
}

impl ControllerError {
    /// Whether a later retry can succeed without a change to the object or the deployment.
    pub fn is_retryable(&self) -> bool {
        match self {
            ControllerError::Store(err) => err.is_retryable(),
            ControllerError::Conflict(_) => true,
            ControllerError::OwnerReference(_)
            | ControllerError::InvalidObject(_)
            | ControllerError::InvalidConfig(_)
            | ControllerError::Server(_) => false,
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            ControllerError::Store(err) => err.kind(),
            ControllerError::Conflict(_) => "conflict",
            ControllerError::OwnerReference(_) => "owner_reference",
            ControllerError::InvalidObject(_) => "invalid_object",
            ControllerError::InvalidConfig(_) => "invalid_config",
            ControllerError::Server(_) => "server",
        }
    }
}

impl From<StoreError> for ControllerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => ControllerError::Conflict(message),
            other => ControllerError::Store(other),
        }
    }
}
