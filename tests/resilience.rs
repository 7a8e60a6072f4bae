//! End-to-end resilience behavior: breaker gating plus retry backoff around
//! a scripted transport, with a manual clock so nothing actually waits.

use std::sync::Arc;

use serde_json::json;
use teamcity_client::{
    BreakerConfig, CircuitBreaker, CircuitState, Invoker, ManualClock, RetryConfig,
    ScriptedTransport, TeamCityError, Transport,
};

fn retry_config(max_retries: usize) -> RetryConfig {
    RetryConfig {
        enabled: true,
        max_retries,
        base_delay_ms: 100,
        max_delay_ms: 5_000,
        exponential: true,
    }
}

fn breaker_config() -> BreakerConfig {
    BreakerConfig {
        enabled: true,
        failure_threshold: 2,
        reset_timeout_ms: 30_000,
        success_threshold: 2,
    }
}

fn harness(
    script: Vec<teamcity_client::Result<serde_json::Value>>,
    max_retries: usize,
) -> (Arc<ScriptedTransport>, Invoker, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let breaker = Arc::new(CircuitBreaker::new(breaker_config(), clock.clone()));
    let transport = Arc::new(ScriptedTransport::new(script));
    let invoker = Invoker::new(retry_config(max_retries), breaker, clock.clone());
    (transport, invoker, clock)
}

fn server_error() -> TeamCityError {
    TeamCityError::Server {
        status: 502,
        message: "bad gateway".to_string(),
        retry_after_secs: None,
    }
}

#[tokio::test]
async fn transient_failures_recover_within_budget() {
    let (transport, invoker, clock) = harness(
        vec![
            Err(server_error()),
            Err(server_error()),
            Ok(json!({"ok": true})),
        ],
        3,
    );

    let value = invoker
        .invoke(|| transport.get("builds", &[]))
        .await
        .unwrap();

    assert_eq!(value["ok"], true);
    assert_eq!(transport.call_count(), 3);
    assert_eq!(
        clock.slept(),
        vec![
            std::time::Duration::from_millis(100),
            std::time::Duration::from_millis(200)
        ]
    );
    assert_eq!(invoker.breaker().state(), CircuitState::Closed);
}

#[tokio::test]
async fn breaker_full_cycle_through_transport() {
    // Retries off so each logical call is one attempt.
    let (transport, invoker, clock) = harness(
        vec![
            Err(server_error()),
            Err(server_error()),
            // probe after cooldown
            Ok(json!({})),
            Ok(json!({})),
        ],
        0,
    );

    // Two consecutive failures trip the breaker.
    for _ in 0..2 {
        let result = invoker.invoke(|| transport.get("builds", &[])).await;
        assert!(result.is_err());
    }
    assert_eq!(invoker.breaker().state(), CircuitState::Open);

    // While open, calls are rejected without touching the transport.
    let rejected = invoker.invoke(|| transport.get("builds", &[])).await;
    assert!(matches!(rejected, Err(TeamCityError::CircuitOpen)));
    assert_eq!(transport.call_count(), 2);

    // After the reset timeout, a probe goes through; two successes close it.
    clock.advance(std::time::Duration::from_secs(30));
    invoker
        .invoke(|| transport.get("builds", &[]))
        .await
        .unwrap();
    assert_eq!(invoker.breaker().state(), CircuitState::HalfOpen);
    invoker
        .invoke(|| transport.get("builds", &[]))
        .await
        .unwrap();
    assert_eq!(invoker.breaker().state(), CircuitState::Closed);
    assert_eq!(transport.call_count(), 4);
}

#[tokio::test]
async fn probe_failure_reopens_the_breaker() {
    let (transport, invoker, clock) = harness(
        vec![
            Err(server_error()),
            Err(server_error()),
            Err(server_error()),
        ],
        0,
    );

    for _ in 0..2 {
        let _ = invoker.invoke(|| transport.get("builds", &[])).await;
    }
    assert_eq!(invoker.breaker().state(), CircuitState::Open);

    clock.advance(std::time::Duration::from_secs(30));
    let probe = invoker.invoke(|| transport.get("builds", &[])).await;
    assert!(probe.is_err());
    assert_eq!(invoker.breaker().state(), CircuitState::Open);

    // Open-time was reset by the failed probe.
    clock.advance(std::time::Duration::from_secs(15));
    assert!(matches!(
        invoker.invoke(|| transport.get("builds", &[])).await,
        Err(TeamCityError::CircuitOpen)
    ));
}

#[tokio::test]
async fn rate_limit_hint_drives_the_wait() {
    let (transport, invoker, clock) = harness(
        vec![
            Err(TeamCityError::RateLimited {
                retry_after_secs: Some(12),
            }),
            Ok(json!({"ok": true})),
        ],
        3,
    );

    invoker
        .invoke(|| transport.get("builds", &[]))
        .await
        .unwrap();

    assert_eq!(clock.slept(), vec![std::time::Duration::from_secs(12)]);
}

#[tokio::test]
async fn unavailable_hint_drives_the_wait() {
    // A 503 with Retry-After gets the same treatment as a 429.
    let (transport, invoker, clock) = harness(
        vec![
            Err(TeamCityError::Server {
                status: 503,
                message: "maintenance".to_string(),
                retry_after_secs: Some(10),
            }),
            Ok(json!({"ok": true})),
        ],
        3,
    );

    invoker
        .invoke(|| transport.get("builds", &[]))
        .await
        .unwrap();

    assert_eq!(clock.slept(), vec![std::time::Duration::from_secs(10)]);
}

#[tokio::test]
async fn client_errors_never_retry() {
    let (transport, invoker, clock) = harness(
        vec![Err(TeamCityError::Client {
            status: 400,
            message: "bad locator".to_string(),
        })],
        5,
    );

    let result = invoker.invoke(|| transport.get("builds", &[])).await;
    assert!(matches!(
        result,
        Err(TeamCityError::Client { status: 400, .. })
    ));
    assert_eq!(transport.call_count(), 1);
    assert!(clock.slept().is_empty());
}
