//! Circuit breaker guarding the transport
//!
//! Closed -> Open after `failure_threshold` consecutive failures; Open ->
//! HalfOpen once `reset_timeout` has elapsed (the next call becomes the
//! probe); HalfOpen -> Closed after `success_threshold` consecutive probe
//! successes, or straight back to Open on any probe failure. Counters reset
//! only on state transitions, so a slow trickle of failures below the
//! threshold never fully clears; trip timing depends on this and it is kept
//! as-is.
//!
//! Breakers are explicit values, one per transport they guard; construct an
//! isolated instance per test rather than sharing anything process-wide.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::BreakerConfig;
use crate::error::{Result, TeamCityError};

/// Observable breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failures: usize,
    successes: usize,
    opened_at: Option<Instant>,
}

/// Gate in front of the transport; all mutable state behind one mutex.
pub struct CircuitBreaker {
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                opened_at: None,
            }),
        }
    }

    /// Gate check before a call. Rejects with [`TeamCityError::CircuitOpen`]
    /// while the breaker is open; once the reset timeout has elapsed the
    /// state moves to half-open and the call proceeds as the probe.
    pub fn try_acquire(&self) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| self.clock.now().duration_since(at));
                match elapsed {
                    Some(elapsed) if elapsed >= self.config.reset_timeout() => {
                        debug!("circuit breaker half-open; allowing probe");
                        Self::transition(&mut inner, CircuitState::HalfOpen);
                        Ok(())
                    }
                    _ => Err(TeamCityError::CircuitOpen),
                }
            }
        }
    }

    /// Report a successful call outcome.
    pub fn record_success(&self) {
        if !self.config.enabled {
            return;
        }

        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            // Consecutive-failure count intentionally survives successes in
            // the closed state; see the module docs.
            CircuitState::Closed => {}
            CircuitState::HalfOpen => {
                inner.successes += 1;
                if inner.successes >= self.config.success_threshold {
                    debug!("circuit breaker closed after successful probes");
                    Self::transition(&mut inner, CircuitState::Closed);
                }
            }
            // An in-flight call that was admitted before the trip; the trip
            // already happened, nothing to update.
            CircuitState::Open => {}
        }
    }

    /// Report a failed call outcome.
    pub fn record_failure(&self) {
        if !self.config.enabled {
            return;
        }

        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => {
                inner.failures += 1;
                if inner.failures >= self.config.failure_threshold {
                    warn!(
                        failures = inner.failures,
                        "circuit breaker tripped open"
                    );
                    Self::transition(&mut inner, CircuitState::Open);
                    inner.opened_at = Some(self.clock.now());
                }
            }
            CircuitState::HalfOpen => {
                warn!("circuit breaker probe failed; reopening");
                Self::transition(&mut inner, CircuitState::Open);
                inner.opened_at = Some(self.clock.now());
            }
            CircuitState::Open => {}
        }
    }

    /// Current state, as a consistent snapshot.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    /// Force the breaker back to closed with cleared counters.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        Self::transition(&mut inner, CircuitState::Closed);
        inner.opened_at = None;
    }

    // Both counters reset on every transition.
    fn transition(inner: &mut BreakerInner, state: CircuitState) {
        inner.state = state;
        inner.failures = 0;
        inner.successes = 0;
    }
}
