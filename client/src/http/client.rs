//! HTTP request dispatcher
//!
//! Sends exactly one request per call and maps the outcome onto
//! [`ApiError`]. Retrying is left to [`crate::retry`].

use std::time::Duration;

use http::Method;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

use crate::errors::{AgentError, ApiError};

/// Successful response body
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Text(String),
}

impl Body {
    /// JSON body, or a generic error if the request did not ask for one
    pub fn into_json(self) -> Result<Value, ApiError> {
        match self {
            Body::Json(value) => Ok(value),
            Body::Text(_) => Err(ApiError::Generic(
                "expected a JSON response body".to_string(),
            )),
        }
    }
}

/// A single request against the device agent
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Url,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
    pub expect_json: bool,
    pub timeout: Option<Duration>,
}

impl RequestDescriptor {
    /// GET request expecting a JSON body
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            body: None,
            query: Vec::new(),
            expect_json: true,
            timeout: None,
        }
    }

    /// POST request with a JSON body
    pub fn post(url: Url, body: Value) -> Self {
        Self {
            method: Method::POST,
            url,
            body: Some(body),
            query: Vec::new(),
            expect_json: true,
            timeout: None,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Do not parse the response body as JSON
    pub fn raw(mut self) -> Self {
        self.expect_json = false;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// HTTP client for the device agent
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client.
    ///
    /// No overall timeout is set on the client so log streams can stay
    /// open; non-streaming requests carry their own timeout.
    pub fn new(connect_timeout: Duration) -> Result<Self, AgentError> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self { client })
    }

    /// Send the request and return the live response if the agent answered
    /// 200. Any other outcome is classified into an [`ApiError`].
    pub async fn open(&self, descriptor: &RequestDescriptor) -> Result<Response, ApiError> {
        debug!("{} {}", descriptor.method, descriptor.url);

        let mut request = self
            .client
            .request(descriptor.method.clone(), descriptor.url.clone());

        if !descriptor.query.is_empty() {
            request = request.query(&descriptor.query);
        }
        if let Some(body) = &descriptor.body {
            request = request.json(body);
        }
        if let Some(timeout) = descriptor.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            error!("{} {} failed: {}", descriptor.method, descriptor.url, e);
            ApiError::from(e)
        })?;

        let status = response.status();
        if status == StatusCode::OK {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!(
            "{} {} failed: {} - {}",
            descriptor.method, descriptor.url, status, body
        );
        Err(classify_failure(status, &body))
    }

    /// Send the request and read the whole body
    pub async fn send(&self, descriptor: &RequestDescriptor) -> Result<Body, ApiError> {
        let response = self.open(descriptor).await?;
        let text = response.text().await?;

        if descriptor.expect_json {
            Ok(Body::Json(serde_json::from_str(&text)?))
        } else {
            Ok(Body::Text(text))
        }
    }
}

/// Map a non-200 status and its body onto the error taxonomy
pub fn classify_failure(status: StatusCode, body: &str) -> ApiError {
    let message = extract_message(body);
    match status {
        StatusCode::BAD_REQUEST => ApiError::BadRequest(message),
        StatusCode::SERVICE_UNAVAILABLE => ApiError::ServiceUnavailable(message),
        other => match message {
            Some(message) => ApiError::Generic(format!(
                "unexpected status code {}: {}",
                other.as_u16(),
                message
            )),
            None => ApiError::Generic(format!("unexpected status code {}", other.as_u16())),
        },
    }
}

/// Message carried by an error body.
///
/// A JSON object yields its `message` field, a JSON string yields itself,
/// and any other non-empty text is used verbatim.
pub fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => match map.get("message") {
            Some(Value::String(message)) => Some(message.clone()),
            Some(other) if !other.is_null() => Some(other.to_string()),
            _ => None,
        },
        Ok(Value::String(message)) => Some(message),
        _ => Some(body.to_string()),
    }
}
