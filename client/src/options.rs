//! Client configuration options

use std::time::Duration;

use url::Url;

use crate::errors::AgentError;
use crate::retry::RetryPolicy;

/// Port the device agent listens on unless told otherwise
pub const DEFAULT_PORT: u16 = 48484;

/// Where the device agent can be reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAddress {
    host: String,
    port: u16,
}

impl DeviceAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Address on the default agent port
    pub fn with_default_port(host: impl Into<String>) -> Self {
        Self::new(host, DEFAULT_PORT)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL every endpoint path is resolved against
    pub fn base_url(&self) -> Result<Url, AgentError> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(AgentError::ConfigError("device host is empty".to_string()));
        }

        // Bare IPv6 literals need brackets inside a URL
        let url = if host.contains(':') && !host.starts_with('[') {
            format!("http://[{}]:{}/", host, self.port)
        } else {
            format!("http://{}:{}/", host, self.port)
        };
        Ok(Url::parse(&url)?)
    }
}

impl Default for DeviceAddress {
    fn default() -> Self {
        Self::with_default_port("127.0.0.1")
    }
}

/// Main client options
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Device agent address
    pub address: DeviceAddress,

    /// Retry policy shared by every retried operation
    pub retry: RetryPolicy,

    /// Timeout for a single non-streaming request
    pub request_timeout: Duration,

    /// Timeout for establishing a connection
    pub connect_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            address: DeviceAddress::default(),
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}
