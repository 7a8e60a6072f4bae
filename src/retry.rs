//! Retry decisions with exponential backoff
//!
//! Deterministic: the same attempt index and inputs always produce the same
//! delay. Jitter, if wanted, belongs to the caller, not this policy.

use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::TeamCityError;

/// Outcome of consulting the retry policy after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    /// Whether another attempt should be made at all
    pub should_retry: bool,
    /// How long to wait before that attempt
    pub delay: Duration,
    /// The zero-based index of the attempt that just failed
    pub attempt: usize,
}

/// Retry policy over a fixed configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn max_retries(&self) -> usize {
        self.config.max_retries
    }

    /// Decide whether and how long to wait after attempt `attempt` failed.
    ///
    /// A server-supplied retry-after hint (seconds) overrides the computed
    /// backoff wholesale; whether to retry at all is still governed by the
    /// remaining attempt budget.
    pub fn decision(&self, attempt: usize, server_hint_secs: Option<u64>) -> RetryDecision {
        let should_retry = self.config.enabled && attempt < self.config.max_retries;

        let delay = match server_hint_secs {
            Some(secs) => Duration::from_secs(secs),
            None => self.backoff_delay(attempt),
        };

        RetryDecision {
            should_retry,
            delay,
            attempt,
        }
    }

    /// `base * 2^attempt` clamped to the configured maximum; fixed `base`
    /// when exponential mode is off.
    fn backoff_delay(&self, attempt: usize) -> Duration {
        if !self.config.exponential {
            return self.config.base_delay();
        }

        let factor = 2u64.saturating_pow(attempt.min(u32::MAX as usize) as u32);
        let millis = self.config.base_delay_ms.saturating_mul(factor);
        Duration::from_millis(millis.min(self.config.max_delay_ms))
    }
}

/// Default classification: retry on 5xx, rate limiting, timeouts, and
/// network-level failures; never on other 4xx, circuit rejections, or
/// anything structural.
pub fn is_retryable(error: &TeamCityError) -> bool {
    match error {
        TeamCityError::Network { .. } => true,
        TeamCityError::Timeout { .. } => true,
        TeamCityError::RateLimited { .. } => true,
        TeamCityError::Server { .. } => true,
        TeamCityError::Client { .. } => false,
        TeamCityError::CircuitOpen => false,
        _ => false,
    }
}
