//! Settings file management

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AgentError;
use crate::logs::LogLevel;
use crate::options::{ClientOptions, DeviceAddress, DEFAULT_PORT};
use crate::retry::RetryPolicy;
use crate::utils::CooldownOptions;

/// Client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON
    #[serde(default)]
    pub json_logs: bool,

    /// Device agent location
    #[serde(default)]
    pub device: DeviceSettings,

    /// Retry policy
    #[serde(default)]
    pub retry: RetrySettings,

    /// Timeout for a single non-streaming request in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Timeout for establishing a connection in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            json_logs: false,
            device: DeviceSettings::default(),
            retry: RetrySettings::default(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let path = path.as_ref();
        debug!("Reading settings from {}", path.display());

        let contents = tokio::fs::read_to_string(path).await?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    /// Runtime options described by these settings
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            address: DeviceAddress::new(self.device.host.clone(), self.device.port),
            retry: self.retry.policy(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }
}

/// Device agent settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Device host name or IP address
    #[serde(default = "default_device_host")]
    pub host: String,

    /// Device agent port
    #[serde(default = "default_device_port")]
    pub port: u16,
}

fn default_device_host() -> String {
    "127.0.0.1".to_string()
}

fn default_device_port() -> u16 {
    DEFAULT_PORT
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            host: default_device_host(),
            port: default_device_port(),
        }
    }
}

/// Retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts per operation, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound on the delay between attempts in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Growth factor of the delay; 1.0 keeps it fixed
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_max_attempts() -> u32 {
    6
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            cooldown: CooldownOptions {
                base_delay: Duration::from_millis(self.initial_delay_ms),
                max_delay: Duration::from_millis(self.max_delay_ms.max(self.initial_delay_ms)),
                multiplier: self.multiplier,
            },
        }
    }
}
