//! HTTP access to the device agent

pub mod client;
pub mod device_api;
pub mod endpoints;
pub mod log_stream;
