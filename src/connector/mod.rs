//! External tool connections with retry
//!
//! Each collaborator the co-host talks to (speech synthesis, slide host
//! automation, dig-line services) sits behind a [`Tool`]. The connector adds
//! connection state tracking and linear-backoff retry on top; the fan-out
//! helper brings up all connectors at once and only fails when every single
//! one is unreachable.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::Value;

use crate::{Error, Result};

/// A connectable external tool
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Tool name, for logs and status reporting
    fn name(&self) -> &str;

    /// Attempt one connection
    async fn try_connect(&self) -> Result<()>;

    /// Release the connection
    async fn shutdown(&self) -> Result<()>;

    /// Invoke a named operation with JSON arguments
    async fn invoke(&self, operation: &str, args: Value) -> Result<Value>;
}

/// Retry behavior for connection attempts
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay grows linearly: `base_delay * attempt_number`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt, where `attempt` is 1-based
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// A [`Tool`] plus connection lifecycle management
pub struct ToolConnector {
    tool: Arc<dyn Tool>,
    retry: RetryPolicy,
    connected: AtomicBool,
}

impl ToolConnector {
    #[must_use]
    pub fn new(tool: Arc<dyn Tool>) -> Self {
        Self::with_retry(tool, RetryPolicy::default())
    }

    #[must_use]
    pub fn with_retry(tool: Arc<dyn Tool>, retry: RetryPolicy) -> Self {
        Self {
            tool,
            retry,
            connected: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.tool.name()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Connect with retry. A no-op when already connected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connector`] once all attempts are exhausted.
    pub async fn connect(&self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        let mut last_error = String::new();
        for attempt in 1..=self.retry.max_attempts {
            match self.tool.try_connect().await {
                Ok(()) => {
                    self.connected.store(true, Ordering::SeqCst);
                    tracing::info!(tool = self.name(), attempt, "tool connected");
                    return Ok(());
                }
                Err(e) => {
                    last_error = e.to_string();
                    tracing::warn!(
                        tool = self.name(),
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        error = %e,
                        "connection attempt failed"
                    );
                    if attempt < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.delay_for(attempt)).await;
                    }
                }
            }
        }

        Err(Error::Connector(format!(
            "{} unreachable after {} attempts: {last_error}",
            self.name(),
            self.retry.max_attempts
        )))
    }

    /// Disconnect. A no-op when already disconnected.
    pub async fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.tool.shutdown().await {
            tracing::warn!(tool = self.name(), error = %e, "tool shutdown failed");
        } else {
            tracing::info!(tool = self.name(), "tool disconnected");
        }
    }

    /// Invoke an operation on the connected tool.
    ///
    /// # Errors
    ///
    /// Fails immediately (no retry) when disconnected, and propagates the
    /// tool's own invocation errors.
    pub async fn invoke(&self, operation: &str, args: Value) -> Result<Value> {
        if !self.is_connected() {
            return Err(Error::Connector(format!(
                "{} is not connected",
                self.name()
            )));
        }
        self.tool.invoke(operation, args).await
    }
}

/// Bring up every connector concurrently.
///
/// Individual failures are logged and tolerated; the call only fails when
/// not a single connector comes up.
///
/// # Errors
///
/// Returns [`Error::Connector`] if every connection fails.
pub async fn connect_all(connectors: &[Arc<ToolConnector>]) -> Result<usize> {
    if connectors.is_empty() {
        return Ok(0);
    }

    let attempts = connectors.iter().map(|c| {
        let connector = Arc::clone(c);
        async move { (connector.name().to_string(), connector.connect().await) }
    });

    let results = futures::future::join_all(attempts).await;

    let mut connected = 0;
    for (name, result) in results {
        match result {
            Ok(()) => connected += 1,
            Err(e) => tracing::error!(tool = %name, error = %e, "tool failed to connect"),
        }
    }

    if connected == 0 {
        return Err(Error::Connector(
            "no tools could be connected".to_string(),
        ));
    }

    tracing::info!(connected, total = connectors.len(), "tool connection sweep complete");
    Ok(connected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    /// Tool that fails a fixed number of attempts before succeeding
    struct FlakyTool {
        failures_left: AtomicU32,
        attempts: AtomicU32,
    }

    impl FlakyTool {
        fn new(failures: u32) -> Self {
            Self {
                failures_left: AtomicU32::new(failures),
                attempts: AtomicU32::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl Tool for FlakyTool {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn try_connect(&self) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(Error::Connector("simulated outage".to_string()));
            }
            Ok(())
        }

        async fn shutdown(&self) -> Result<()> {
            Ok(())
        }

        async fn invoke(&self, operation: &str, _args: Value) -> Result<Value> {
            Ok(serde_json::json!({ "operation": operation }))
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn connects_after_transient_failures() {
        let tool = Arc::new(FlakyTool::new(2));
        let connector = ToolConnector::with_retry(Arc::clone(&tool) as Arc<dyn Tool>, fast_retry());

        connector.connect().await.unwrap();
        assert!(connector.is_connected());
        assert_eq!(tool.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let tool = Arc::new(FlakyTool::new(10));
        let connector = ToolConnector::with_retry(Arc::clone(&tool) as Arc<dyn Tool>, fast_retry());

        assert!(connector.connect().await.is_err());
        assert!(!connector.is_connected());
        assert_eq!(tool.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn connect_is_idempotent() {
        let tool = Arc::new(FlakyTool::new(0));
        let connector = ToolConnector::with_retry(Arc::clone(&tool) as Arc<dyn Tool>, fast_retry());

        connector.connect().await.unwrap();
        connector.connect().await.unwrap();
        assert_eq!(tool.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invoke_fails_fast_when_disconnected() {
        let connector =
            ToolConnector::with_retry(Arc::new(FlakyTool::new(0)) as Arc<dyn Tool>, fast_retry());

        let err = connector
            .invoke("speak", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not connected"));
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let connector =
            ToolConnector::with_retry(Arc::new(FlakyTool::new(0)) as Arc<dyn Tool>, fast_retry());

        connector.connect().await.unwrap();
        connector.disconnect().await;
        connector.disconnect().await;
        assert!(!connector.is_connected());
    }

    #[tokio::test]
    async fn connect_all_tolerates_partial_failure() {
        let good = Arc::new(ToolConnector::with_retry(
            Arc::new(FlakyTool::new(0)) as Arc<dyn Tool>,
            fast_retry(),
        ));
        let bad = Arc::new(ToolConnector::with_retry(
            Arc::new(FlakyTool::new(10)) as Arc<dyn Tool>,
            fast_retry(),
        ));

        let connected = connect_all(&[good.clone(), bad.clone()]).await.unwrap();
        assert_eq!(connected, 1);
        assert!(good.is_connected());
        assert!(!bad.is_connected());
    }

    #[tokio::test]
    async fn connect_all_fails_when_nothing_connects() {
        let bad = Arc::new(ToolConnector::with_retry(
            Arc::new(FlakyTool::new(10)) as Arc<dyn Tool>,
            fast_retry(),
        ));

        assert!(connect_all(&[bad]).await.is_err());
    }
}
