//! Scripted stand-in for the device agent

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use devagent::{ClientOptions, DeviceAddress, DeviceApi, RetryPolicy};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Request as seen by the mock agent
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

struct Script {
    responses: Vec<(StatusCode, String)>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Mock agent answering with a fixed sequence of responses. Once the
/// sequence is exhausted the last response repeats.
pub struct MockAgent {
    addr: SocketAddr,
    script: Arc<Script>,
}

impl MockAgent {
    pub async fn start(responses: Vec<(StatusCode, &str)>) -> Self {
        assert!(!responses.is_empty());
        let script = Arc::new(Script {
            responses: responses
                .into_iter()
                .map(|(status, body)| (status, body.to_string()))
                .collect(),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .fallback(respond)
            .with_state(script.clone());
        let addr = serve(app).await;

        Self { addr, script }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.script.requests.lock().unwrap().len()
    }

    /// Client with a fixed retry delay
    pub fn client(&self, max_attempts: u32, delay: Duration) -> DeviceApi {
        client_for(self.addr, RetryPolicy::fixed(max_attempts, delay))
    }

    pub fn client_with_policy(&self, policy: RetryPolicy) -> DeviceApi {
        client_for(self.addr, policy)
    }
}

pub fn client_for(addr: SocketAddr, retry: RetryPolicy) -> DeviceApi {
    DeviceApi::new(ClientOptions {
        address: DeviceAddress::new(addr.ip().to_string(), addr.port()),
        retry,
        request_timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(1),
    })
    .unwrap()
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Agent whose log endpoint emits a line every 20ms and never finishes.
///
/// The receiver resolves once the server drops the response body, which
/// happens when the client goes away.
pub async fn start_endless_logs() -> (SocketAddr, oneshot::Receiver<()>) {
    let (released_tx, released_rx) = oneshot::channel::<()>();
    let slot = Arc::new(Mutex::new(Some(released_tx)));

    let app = Router::new().route(
        "/v2/local/logs",
        get(move || {
            let guard = slot.lock().unwrap().take();
            async move {
                let lines = futures::stream::unfold((guard, 0u64), |(guard, n)| async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    let line = format!("{{\"message\":\"tick {}\"}}\n", n);
                    Some((Ok::<_, std::io::Error>(line), (guard, n + 1)))
                });
                Body::from_stream(lines)
            }
        }),
    );

    (serve(app).await, released_rx)
}

/// Agent whose log endpoint never sends response headers
pub async fn start_stalled_logs() -> SocketAddr {
    let app = Router::new().route(
        "/v2/local/logs",
        get(|| async {
            std::future::pending::<()>().await;
            ""
        }),
    );
    serve(app).await
}

/// Address nothing is listening on
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

async fn respond(
    State(script): State<Arc<Script>>,
    method: Method,
    uri: Uri,
    headers: axum::http::HeaderMap,
    body: String,
) -> Response {
    let index = {
        let mut requests = script.requests.lock().unwrap();
        requests.push(RecordedRequest {
            method,
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            content_type: headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body,
        });
        requests.len() - 1
    };

    let (status, body) = script.responses[index.min(script.responses.len() - 1)].clone();
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}
