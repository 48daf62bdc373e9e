//! Worker lifecycle states and event-extension helpers.
//!
//! Event handlers hand their async work to a spawned task and then await it.
//! The awaiting side defines when the event is complete; the spawned side
//! guarantees that work already started (a fetch, a cache write) runs to the
//! end even if the awaiting future is dropped.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use revcache_core::Error;

/// Lifecycle states of a worker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Constructed, manifest loaded, no lifecycle event seen yet.
    Parsed,
    /// `install` finished.
    Installed,
    /// `activate` is running reconciliation.
    Activating,
    /// Active and serving.
    Activated,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Parsed => f.write_str("parsed"),
            WorkerState::Installed => f.write_str("installed"),
            WorkerState::Activating => f.write_str("activating"),
            WorkerState::Activated => f.write_str("activated"),
        }
    }
}

/// Extend a lifecycle event until `work` settles.
///
/// Failures are logged and swallowed: the event still completes, only the
/// result is lost.
pub async fn wait_until<F, T>(event: &'static str, work: F) -> Option<T>
where
    F: Future<Output = Result<T, Error>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(work).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            tracing::warn!(event, error = %e, "lifecycle work failed");
            None
        }
        Err(e) => {
            tracing::warn!(event, error = %e, "lifecycle work aborted");
            None
        }
    }
}

/// Produce a response from `work`, letting it finish even if the caller goes away.
pub async fn respond_with<F, T>(work: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_until_returns_value() {
        let value = wait_until("activate", async { Ok::<_, Error>(7) }).await;
        assert_eq!(value, Some(7));
    }

    #[tokio::test]
    async fn test_wait_until_swallows_errors() {
        let value: Option<()> = wait_until("activate", async { Err(Error::Network("down".into())) }).await;
        assert!(value.is_none());
    }

    async fn explode() -> Result<(), Error> {
        panic!("boom")
    }

    #[tokio::test]
    async fn test_wait_until_swallows_panics() {
        let value = wait_until("activate", explode()).await;
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_respond_with_propagates_errors() {
        let result: Result<(), Error> = respond_with(async { Err(Error::Network("down".into())) }).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_respond_with_survives_dropped_caller() {
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);

        let call = respond_with(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });
        let timed_out = tokio::time::timeout(Duration::from_millis(5), call).await;
        assert!(timed_out.is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(done.load(Ordering::SeqCst));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(WorkerState::Activated.to_string(), "activated");
        assert_eq!(serde_json::to_string(&WorkerState::Activating).unwrap(), "\"activating\"");
    }
}
