//! Device agent endpoints

/// Action exposed by the device agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    SetTargetState,
    GetTargetState,
    GetDeviceInformation,
    Logs,
    Ping,
    Version,
    Status,
    ContainerId,
}

impl Endpoint {
    pub const ALL: [Endpoint; 8] = [
        Endpoint::SetTargetState,
        Endpoint::GetTargetState,
        Endpoint::GetDeviceInformation,
        Endpoint::Logs,
        Endpoint::Ping,
        Endpoint::Version,
        Endpoint::Status,
        Endpoint::ContainerId,
    ];

    /// Path relative to the agent's base URL
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::SetTargetState | Endpoint::GetTargetState => "v2/local/target-state",
            Endpoint::GetDeviceInformation => "v2/local/device-info",
            Endpoint::Logs => "v2/local/logs",
            Endpoint::Ping => "ping",
            Endpoint::Version => "v2/version",
            Endpoint::Status => "v2/state/status",
            Endpoint::ContainerId => "v2/containerId",
        }
    }
}
