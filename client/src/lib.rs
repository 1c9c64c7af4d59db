//! Device Agent Client Library
//!
//! Resilient access to the HTTP API of the agent running on a managed device.

pub mod errors;
pub mod http;
pub mod logs;
pub mod options;
pub mod retry;
pub mod settings;
pub mod utils;

pub use errors::{AgentError, ApiError};
pub use http::device_api::{DeviceApi, DeviceApiExt};
pub use http::log_stream::LogStream;
pub use options::{ClientOptions, DeviceAddress, DEFAULT_PORT};
pub use retry::{run_with_retry, RetryPolicy};
