//! Injectable time source for resilience components
//!
//! Retry waits and circuit-breaker cooldowns go through a [`Clock`] so tests
//! can replace real waiting with a [`ManualClock`] and assert delay values
//! without elapsed wall-clock time.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Time source used by the retry loop and the circuit breaker.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current instant, for breaker cooldown checks.
    fn now(&self) -> Instant;

    /// Cooperative suspension for the given duration. Must not busy-wait.
    async fn sleep(&self, duration: Duration);
}

/// Real clock backed by Tokio timers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Manually advanced clock for tests. `sleep` returns immediately, records
/// the requested duration, and advances the clock by it.
#[derive(Debug)]
pub struct ManualClock {
    inner: Mutex<ManualState>,
}

#[derive(Debug)]
struct ManualState {
    now: Instant,
    slept: Vec<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ManualState {
                now: Instant::now(),
                slept: Vec::new(),
            }),
        }
    }

    /// Move time forward without a sleep, e.g. to elapse a breaker cooldown.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.inner.lock().unwrap();
        state.now += duration;
    }

    /// Durations passed to `sleep`, in call order.
    pub fn slept(&self) -> Vec<Duration> {
        self.inner.lock().unwrap().slept.clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.inner.lock().unwrap().now
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.inner.lock().unwrap();
        state.now += duration;
        state.slept.push(duration);
    }
}
