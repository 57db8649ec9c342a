//! Reconcile context
//!
//! Carries the cancellation signal and per-call timeout for one reconcile
//! invocation. Every store call made by the reconciler goes through
//! [`ReconcileContext::run`].

use resource_store::StoreError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

/// Cancellation signal and deadline applied to store calls
#[derive(Debug, Clone)]
pub struct ReconcileContext {
    cancel: watch::Receiver<bool>,
    timeout: Duration,
}

impl ReconcileContext {
    /// Context cancelled when `true` is sent on the paired sender
    pub fn new(cancel: watch::Receiver<bool>, timeout: Duration) -> Self {
        Self { cancel, timeout }
    }

    /// Context that is never cancelled, only bounded by `timeout`
    #[cfg(test)]
    pub fn detached(timeout: Duration) -> Self {
        // A dropped sender leaves the value at `false` forever
        let (_tx, rx) = watch::channel(false);
        Self::new(rx, timeout)
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Runs `call`, aborting it on cancellation or when the timeout elapses.
    ///
    /// `operation` names the call in the returned error.
    pub async fn run<T, F>(&self, operation: &str, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        if self.is_cancelled() {
            return Err(StoreError::Cancelled(format!("{operation}: reconcile cancelled")));
        }

        tokio::select! {
            biased;
            () = cancellation_requested(self.cancel.clone()) => {
                Err(StoreError::Cancelled(format!("{operation}: reconcile cancelled")))
            }
            result = tokio::time::timeout(self.timeout, call) => match result {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout(format!(
                    "{operation}: no response within {}s",
                    self.timeout.as_secs_f64()
                ))),
            },
        }
    }
}

/// Resolves once `true` is observed on `rx`; never resolves if the sender is gone.
pub async fn cancellation_requested(mut rx: watch::Receiver<bool>) {
    let sender_gone = rx.wait_for(|cancelled| *cancelled).await.is_err();
    if sender_gone {
        std::future::pending::<()>().await;
    }
}
