//! API models

use serde::{Deserialize, Serialize};

/// Value of the `status` field on responses that follow the success envelope
pub const STATUS_SUCCESS: &str = "success";

/// Device information reported by the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_type: String,
    pub arch: String,
}

/// Whether the device has converged on its target state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    Applied,
    Applying,
}

/// A running (or starting) container on the device.
///
/// Every field is optional: services that are still being installed have no
/// container id or creation time yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerStatus {
    pub status: Option<String>,
    pub service_name: Option<String>,
    pub app_id: Option<u64>,
    pub image_id: Option<u64>,
    pub service_id: Option<u64>,
    pub container_id: Option<String>,
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// An image known to the device, possibly still downloading
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageStatus {
    pub name: Option<String>,
    pub app_id: Option<u64>,
    pub service_name: Option<String>,
    pub image_id: Option<u64>,
    pub docker_image_id: Option<String>,
    pub status: Option<String>,
    /// Percentage in [0, 100], passed through as reported
    pub download_progress: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Snapshot of the device's application state.
///
/// Built from the status endpoint body with the envelope `status` field
/// removed. Fields this model does not name are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub app_state: AppState,
    pub overall_download_progress: Option<f64>,
    #[serde(default)]
    pub containers: Vec<ContainerStatus>,
    #[serde(default)]
    pub images: Vec<ImageStatus>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One line of the device log stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(default)]
    pub message: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub is_std_err: bool,
    pub service_name: Option<String>,
    pub service_id: Option<u64>,
    pub image_id: Option<u64>,
    pub app_id: Option<u64>,
}

/// Target state response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetStateResponse {
    pub state: serde_json::Value,
}

/// Device information response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfoResponse {
    pub info: DeviceInfo,
}

/// Container id response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerIdResponse {
    pub status: String,
    pub container_id: Option<String>,
}

/// Agent version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub status: String,
    pub version: Option<String>,
}
