//! Bounded worker pool for provider calls.
//!
//! Every call runs in its own tokio task holding one semaphore permit, so
//! a slow upstream never stalls the caller's task and the number of
//! in-flight requests stays bounded. The whole call (waiting for a slot
//! included) is capped by the configured timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::gateway::config::GatewayConfig;
use crate::gateway::message::NormalizedRequest;
use crate::gateway::provider::ProviderAdapter;

/// Runs provider calls on spawned tasks with a concurrency limit and timeout.
#[derive(Debug, Clone)]
pub struct ProviderExecutor {
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl ProviderExecutor {
    /// Creates an executor with `max_concurrency` worker slots.
    #[must_use]
    pub fn new(max_concurrency: usize, timeout: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            timeout,
        }
    }

    /// Creates an executor from gateway configuration.
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.max_concurrency, config.timeout)
    }

    /// Per-call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Worker slots not currently in use.
    #[must_use]
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }

    /// Sends `request` through `provider` on a worker task.
    ///
    /// If the timeout elapses the task is detached rather than aborted:
    /// the HTTP request runs to completion, its result is discarded, and
    /// the slot is released when the task ends.
    ///
    /// # Errors
    ///
    /// Returns the provider's error, [`ProviderError::Timeout`] on expiry,
    /// or [`ProviderError::Unexpected`] if the worker task panicked.
    pub async fn run(
        &self,
        provider: Arc<dyn ProviderAdapter>,
        request: NormalizedRequest,
    ) -> Result<String, ProviderError> {
        let permits = Arc::clone(&self.permits);
        let provider_name = provider.name();

        let call = async move {
            let permit =
                permits
                    .acquire_owned()
                    .await
                    .map_err(|e| ProviderError::Unexpected {
                        message: format!("worker pool closed: {e}"),
                    })?;

            let handle = tokio::spawn(async move {
                let _permit = permit;
                provider.send(&request).await
            });

            match handle.await {
                Ok(result) => result,
                Err(e) if e.is_panic() => Err(ProviderError::Unexpected {
                    message: "provider task panicked".to_string(),
                }),
                Err(e) => Err(ProviderError::Unexpected {
                    message: format!("provider task failed: {e}"),
                }),
            }
        };

        debug!(provider = provider_name, timeout = ?self.timeout, "Dispatching provider call");
        if let Ok(result) = tokio::time::timeout(self.timeout, call).await {
            result
        } else {
            warn!(provider = provider_name, timeout = ?self.timeout, "Provider call timed out");
            Err(ProviderError::Timeout {
                timeout: self.timeout,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::gateway::message::{GenerationParams, Turn};

    struct Sleepy(Duration);

    #[async_trait]
    impl ProviderAdapter for Sleepy {
        fn name(&self) -> &'static str {
            "sleepy"
        }

        async fn send(&self, _request: &NormalizedRequest) -> Result<String, ProviderError> {
            tokio::time::sleep(self.0).await;
            Ok("done".to_string())
        }
    }

    struct Panicky;

    #[async_trait]
    impl ProviderAdapter for Panicky {
        fn name(&self) -> &'static str {
            "panicky"
        }

        async fn send(&self, _request: &NormalizedRequest) -> Result<String, ProviderError> {
            panic!("adapter bug");
        }
    }

    fn request() -> NormalizedRequest {
        NormalizedRequest::new(
            vec![Turn::user("hi")],
            "model",
            GenerationParams {
                temperature: 0.7,
                max_output_tokens: 10,
                structured_output: false,
            },
        )
    }

    #[tokio::test]
    async fn test_run_returns_provider_result() {
        let executor = ProviderExecutor::new(2, Duration::from_secs(5));
        let result = executor
            .run(Arc::new(Sleepy(Duration::from_millis(1))), request())
            .await;
        assert_eq!(result, Ok("done".to_string()));
        assert_eq!(executor.available_slots(), 2);
    }

    #[tokio::test]
    async fn test_timeout_detaches_and_releases_slot() {
        let executor = ProviderExecutor::new(1, Duration::from_millis(50));
        let result = executor
            .run(Arc::new(Sleepy(Duration::from_millis(300))), request())
            .await;
        assert_eq!(
            result,
            Err(ProviderError::Timeout {
                timeout: Duration::from_millis(50)
            })
        );
        // Detached task still holds the slot until it finishes
        assert_eq!(executor.available_slots(), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(executor.available_slots(), 1);
    }

    #[tokio::test]
    async fn test_panic_maps_to_unexpected() {
        let executor = ProviderExecutor::new(1, Duration::from_secs(5));
        let result = executor.run(Arc::new(Panicky), request()).await;
        assert!(matches!(result, Err(ProviderError::Unexpected { .. })));
        assert_eq!(executor.available_slots(), 1);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let executor = ProviderExecutor::new(1, Duration::from_secs(5));
        let provider: Arc<dyn ProviderAdapter> = Arc::new(Sleepy(Duration::from_millis(100)));

        let first = executor.run(Arc::clone(&provider), request());
        let second = executor.run(Arc::clone(&provider), request());
        let start = std::time::Instant::now();
        let (a, b) = tokio::join!(first, second);
        assert!(a.is_ok() && b.is_ok());
        assert!(start.elapsed() >= Duration::from_millis(200));
    }
}
