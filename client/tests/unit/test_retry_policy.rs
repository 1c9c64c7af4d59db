//! Retry behaviour observed through the device API

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use devagent::utils::CooldownOptions;
use devagent::{ApiError, DeviceApiExt, RetryPolicy};
use tokio_util::sync::CancellationToken;

use crate::mock_agent::{client_for, closed_addr, MockAgent};

#[tokio::test]
async fn test_connection_refused_is_retried() {
    let addr = closed_addr().await;
    let api = client_for(addr, RetryPolicy::fixed(3, Duration::from_millis(20)));

    let start = Instant::now();
    let result = api.ping().await;

    assert!(matches!(result, Err(ApiError::Generic(_))));
    // Two waits between three attempts
    assert!(start.elapsed() >= Duration::from_millis(40));
}

#[tokio::test]
async fn test_exponential_backoff_between_attempts() {
    let agent = MockAgent::start(vec![
        (StatusCode::SERVICE_UNAVAILABLE, ""),
        (StatusCode::SERVICE_UNAVAILABLE, ""),
        (StatusCode::OK, "OK"),
    ])
    .await;
    let api = agent.client_with_policy(RetryPolicy {
        max_attempts: 6,
        cooldown: CooldownOptions {
            base_delay: Duration::from_millis(20),
            max_delay: Duration::from_secs(1),
            multiplier: 2.0,
        },
    });

    let start = Instant::now();
    assert_eq!(api.ping().await, Ok(()));

    // 20ms then 40ms
    assert!(start.elapsed() >= Duration::from_millis(60));
    assert_eq!(agent.calls(), 3);
}

#[tokio::test]
async fn test_cancel_during_wait_stops_attempts() {
    let agent = MockAgent::start(vec![
        (StatusCode::SERVICE_UNAVAILABLE, ""),
        (StatusCode::OK, r#"{"state":{}}"#),
    ])
    .await;
    let cancel = CancellationToken::new();
    let api = agent
        .client(6, Duration::from_secs(30))
        .with_cancellation(cancel.clone());

    let token = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let result = api.get_target_state().await;

    assert_eq!(result, Err(ApiError::Cancelled));
    assert_eq!(agent.calls(), 1);
}
