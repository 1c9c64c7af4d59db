//! Log stream tests

use std::time::Duration;

use axum::http::StatusCode;
use devagent::{ApiError, DeviceApiExt, RetryPolicy};
use futures::StreamExt;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::mock_agent::{client_for, start_endless_logs, start_stalled_logs, MockAgent};

#[tokio::test]
async fn test_log_stream_lines() {
    let agent = MockAgent::start(vec![(
        StatusCode::OK,
        "{\"message\":\"Starting\",\"isSystem\":true,\"timestamp\":1700000000000}\n\
         {\"message\":\"hello\",\"serviceName\":\"main\",\"timestamp\":1700000000001}\n",
    )])
    .await;
    let api = agent.client(6, Duration::from_millis(5));

    let entries: Vec<_> = api.get_log_stream().await.unwrap().into_entries().collect().await;

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].as_ref().unwrap().message, "Starting");
    assert_eq!(
        entries[1].as_ref().unwrap().service_name.as_deref(),
        Some("main")
    );
    assert_eq!(agent.requests()[0].path, "/v2/local/logs");
}

#[tokio::test]
async fn test_log_stream_is_not_retried() {
    let agent = MockAgent::start(vec![(StatusCode::SERVICE_UNAVAILABLE, "busy")]).await;
    let api = agent.client(6, Duration::from_millis(5));

    let result = api.get_log_stream().await;

    assert!(matches!(
        result,
        Err(ApiError::ServiceUnavailable(Some(ref message))) if message == "busy"
    ));
    assert_eq!(agent.calls(), 1);
}

#[tokio::test]
async fn test_log_stream_close_releases_connection() {
    let (addr, released) = start_endless_logs().await;
    let api = client_for(addr, RetryPolicy::fixed(1, Duration::from_millis(5)));

    let mut logs = api.get_log_stream().await.unwrap();
    let entry = logs.next_entry().await.unwrap().unwrap();
    assert_eq!(entry.message, "tick 0");
    logs.close();

    let result = timeout(Duration::from_secs(5), released).await;
    assert!(result.is_ok(), "agent still streaming after close");
}

#[tokio::test]
async fn test_log_stream_released_when_caller_stops() {
    let (addr, released) = start_endless_logs().await;
    let cancel = CancellationToken::new();
    let api = client_for(addr, RetryPolicy::fixed(1, Duration::from_millis(5)));

    let token = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    {
        let mut logs = api.get_log_stream().await.unwrap();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                entry = logs.next_entry() => {
                    assert!(entry.unwrap().is_ok());
                }
            }
        }
    }

    let result = timeout(Duration::from_secs(5), released).await;
    assert!(result.is_ok(), "agent still streaming after drop");
}

#[tokio::test]
async fn test_log_stream_cancelled_before_headers() {
    let addr = start_stalled_logs().await;
    let cancel = CancellationToken::new();
    let api = client_for(addr, RetryPolicy::fixed(1, Duration::from_millis(5)))
        .with_cancellation(cancel.clone());

    let token = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let result = timeout(Duration::from_secs(2), api.get_log_stream()).await;

    assert!(matches!(result, Ok(Err(ApiError::Cancelled))));
}
