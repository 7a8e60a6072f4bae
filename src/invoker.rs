//! Resilient wrapper around a single logical remote call
//!
//! The invoker checks the circuit-breaker gate once per logical call, then
//! runs the retry loop. Exactly one outcome is reported to the breaker per
//! logical call, the final one, so one caller's retries cannot trip the
//! breaker on their own. A circuit rejection surfaces immediately as
//! [`TeamCityError::CircuitOpen`] without consuming any retry attempt.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::breaker::CircuitBreaker;
use crate::clock::Clock;
use crate::config::RetryConfig;
use crate::error::Result;
use crate::retry::{is_retryable, RetryPolicy};

/// Applies circuit-breaker gating and retry backoff around remote calls.
pub struct Invoker {
    policy: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
    clock: Arc<dyn Clock>,
}

impl Invoker {
    pub fn new(retry: RetryConfig, breaker: Arc<CircuitBreaker>, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy: RetryPolicy::new(retry),
            breaker,
            clock,
        }
    }

    /// The breaker guarding this invoker, for introspection and reset.
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Run `operation`, retrying transient failures with backoff. The last
    /// error is returned unchanged so callers can inspect its classification.
    pub async fn invoke<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.breaker.try_acquire()?;

        let mut attempt: usize = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempts = attempt + 1, "call succeeded after retries");
                    }
                    self.breaker.record_success();
                    return Ok(value);
                }
                Err(error) => {
                    if !is_retryable(&error) {
                        debug!(%error, "non-retryable error");
                        self.breaker.record_failure();
                        return Err(error);
                    }

                    let decision = self.policy.decision(attempt, error.retry_after_secs());
                    if !decision.should_retry {
                        warn!(
                            attempts = attempt + 1,
                            max_retries = self.policy.max_retries(),
                            %error,
                            "retry budget exhausted"
                        );
                        self.breaker.record_failure();
                        return Err(error);
                    }

                    debug!(
                        attempt = decision.attempt,
                        delay_ms = decision.delay.as_millis() as u64,
                        %error,
                        "retrying after delay"
                    );
                    self.clock.sleep(decision.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
