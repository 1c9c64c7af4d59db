//! Error types for the device agent client

use thiserror::Error;

/// Failure of a request against the device agent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// HTTP 400. The request is malformed and will fail the same way again.
    #[error("Bad request: {}", .0.as_deref().unwrap_or("no message"))]
    BadRequest(Option<String>),

    /// HTTP 503. The agent is busy and may accept the request later.
    #[error("Service unavailable: {}", .0.as_deref().unwrap_or("no message"))]
    ServiceUnavailable(Option<String>),

    /// Transport failure, unparseable body, unexpected status or body shape
    #[error("Request failed: {0}")]
    Generic(String),

    /// The caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,
}

impl ApiError {
    /// Whether another attempt of the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::ServiceUnavailable(_) | ApiError::Generic(_) => true,
            ApiError::BadRequest(_) | ApiError::Cancelled => false,
        }
    }

    /// Server-provided or transport message, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            ApiError::BadRequest(msg) | ApiError::ServiceUnavailable(msg) => msg.as_deref(),
            ApiError::Generic(msg) => Some(msg),
            ApiError::Cancelled => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Generic(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Generic(format!("invalid response body: {}", err))
    }
}

/// Error type for everything around the client: settings, logging, CLI
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Usage error: {0}")]
    UsageError(String),
}
