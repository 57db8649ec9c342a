//! # Controller Configuration
//!
//! Settings loaded from environment variables. Every setting has a default,
//! so an empty environment yields a working controller that watches all
//! namespaces.

use crate::error::ControllerError;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_METRICS_PORT: u16 = 8080;
pub const DEFAULT_PULL_SECRET_NAME: &str = "regcred";
pub const DEFAULT_PULL_SECRET_SOURCE_NAMESPACE: &str = "hello-world-system";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REQUEUE_AFTER_SECS: u64 = 5;
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch, `None` for all namespaces
    pub watch_namespace: Option<String>,
    /// HTTP server port for metrics and health probes
    pub metrics_port: u16,
    /// Name of the image-pull secret provisioned into workload namespaces
    pub pull_secret_name: String,
    /// Namespace the image-pull secret is copied from
    pub pull_secret_source_namespace: String,
    /// Upper bound for a single API call made during reconciliation
    pub request_timeout: Duration,
    /// Delay before re-checking a freshly created Pod
    pub requeue_after: Duration,
    /// First delay of the error backoff (seconds)
    pub backoff_min_secs: u64,
    /// Cap of the error backoff (seconds)
    pub backoff_max_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            metrics_port: DEFAULT_METRICS_PORT,
            pull_secret_name: DEFAULT_PULL_SECRET_NAME.to_string(),
            pull_secret_source_namespace: DEFAULT_PULL_SECRET_SOURCE_NAMESPACE.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            requeue_after: Duration::from_secs(DEFAULT_REQUEUE_AFTER_SECS),
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns the raw value of a variable if set
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            watch_namespace: string_var(&lookup, "WATCH_NAMESPACE"),
            metrics_port: env_var_or_default(&lookup, "METRICS_PORT", DEFAULT_METRICS_PORT)?,
            pull_secret_name: string_var(&lookup, "PULL_SECRET_NAME")
                .unwrap_or_else(|| DEFAULT_PULL_SECRET_NAME.to_string()),
            pull_secret_source_namespace: string_var(&lookup, "PULL_SECRET_SOURCE_NAMESPACE")
                .unwrap_or_else(|| DEFAULT_PULL_SECRET_SOURCE_NAMESPACE.to_string()),
            request_timeout: Duration::from_secs(env_var_or_default(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            requeue_after: Duration::from_secs(env_var_or_default(
                &lookup,
                "REQUEUE_AFTER_SECS",
                DEFAULT_REQUEUE_AFTER_SECS,
            )?),
            backoff_min_secs: env_var_or_default(&lookup, "BACKOFF_MIN_SECS", DEFAULT_BACKOFF_MIN_SECS)?,
            backoff_max_secs: env_var_or_default(&lookup, "BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ControllerError> {
        if self.request_timeout.is_zero() {
            return Err(ControllerError::InvalidConfig(
                "REQUEST_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }
        if self.backoff_min_secs == 0 {
            return Err(ControllerError::InvalidConfig(
                "BACKOFF_MIN_SECS must be greater than 0".to_string(),
            ));
        }
        if self.backoff_min_secs > self.backoff_max_secs {
            return Err(ControllerError::InvalidConfig(format!(
                "BACKOFF_MIN_SECS ({}) must not exceed BACKOFF_MAX_SECS ({})",
                self.backoff_min_secs, self.backoff_max_secs
            )));
        }
        Ok(())
    }
}

/// Non-empty, trimmed string value of `key`
fn string_var<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read and parse `key`, or return `default` when unset.
///
/// A value that is set but does not parse is a configuration error rather
/// than a silent fallback.
fn env_var_or_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ControllerError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    match string_var(lookup, key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| ControllerError::InvalidConfig(format!("{key}={raw:?}: {e}"))),
        None => Ok(default),
    }
}
