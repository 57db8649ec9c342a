//! Resource store errors

use thiserror::Error;

/// Errors returned by a [`ResourceStore`](crate::ResourceStore).
///
/// The variants follow the API server's status codes closely enough that the
/// controller can decide between short-circuiting (`NotFound`), treating the
/// call as done (`AlreadyExists`) and retrying later (everything else).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Object does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Object with the same name already exists (409, reason AlreadyExists)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Optimistic concurrency check failed (409, reason Conflict)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Caller is not allowed to perform the operation (401/403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// API server or network unavailable (429, 5xx, transport errors)
    #[error("Transient error: {0}")]
    Transient(String),

    /// Request rejected by the API server for another reason
    #[error("API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The reconcile context was cancelled while the call was in flight
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// The call did not complete within the configured timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl StoreError {
    /// Whether the error is a 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// Whether the error means a create found an existing object.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists(_))
    }

    /// Whether the error is an optimistic concurrency failure.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }

    /// Whether the call was aborted because the reconcile was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StoreError::Cancelled(_))
    }

    /// Whether retrying the same call later can succeed without outside help.
    ///
    /// `Forbidden` and `Serialization` need a change elsewhere (RBAC, schema)
    /// before a retry can succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StoreError::Forbidden(_) | StoreError::Serialization(_))
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "not_found",
            StoreError::AlreadyExists(_) => "already_exists",
            StoreError::Conflict(_) => "conflict",
            StoreError::Forbidden(_) => "forbidden",
            StoreError::Transient(_) => "transient",
            StoreError::Api(_) => "api",
            StoreError::Serialization(_) => "serialization",
            StoreError::Cancelled(_) => "cancelled",
            StoreError::Timeout(_) => "timeout",
        }
    }
}

impl From<kube::Error> for StoreError {
    fn from(err: kube::Error) -> Self {
        match &err {
            kube::Error::Api(status) => {
                let message = status.message.clone();
                match status.code {
                    404 => StoreError::NotFound(message),
                    409 if status.reason == "AlreadyExists" => StoreError::AlreadyExists(message),
                    409 => StoreError::Conflict(message),
                    401 | 403 => StoreError::Forbidden(message),
                    429 | 500..=599 => StoreError::Transient(message),
                    _ => StoreError::Api(format!("{} ({}): {}", status.reason, status.code, message)),
                }
            }
            _ => StoreError::Transient(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(StoreError::Conflict("stale".to_string()).is_retryable());
        assert!(StoreError::Transient("connection reset".to_string()).is_retryable());
        assert!(StoreError::Cancelled("shutdown".to_string()).is_retryable());
        assert!(StoreError::Timeout("30s".to_string()).is_retryable());
        assert!(!StoreError::Forbidden("pods is forbidden".to_string()).is_retryable());
        assert!(!StoreError::Serialization("bad json".to_string()).is_retryable());
    }

    #[test]
    fn test_predicates() {
        assert!(StoreError::Cancelled("shutdown".to_string()).is_cancelled());
        assert!(!StoreError::Timeout("30s".to_string()).is_cancelled());
        assert!(StoreError::NotFound("x".to_string()).is_not_found());
        assert!(StoreError::AlreadyExists("x".to_string()).is_already_exists());
        assert!(StoreError::Conflict("x".to_string()).is_conflict());
        assert!(!StoreError::Api("x".to_string()).is_not_found());
        assert_eq!(StoreError::Timeout("x".to_string()).kind(), "timeout");
    }

    #[test]
    fn test_from_serde_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(StoreError::from(err), StoreError::Serialization(_)));
    }
}
