//! Wire types shared by the API server, the idle monitor and the command
//! sidecar.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of the managed instance as reported by the compute
/// provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    /// The provider has no record of the instance, or reported a status we
    /// do not model.
    Unknown,
    Provisioning,
    Running,
    Stopping,
    Stopped,
}

impl InstanceStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Provisioning => "provisioning",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }

    /// `true` once the instance is on its way down or already down.
    #[must_use]
    pub fn is_halted(self) -> bool {
        matches!(self, Self::Stopping | Self::Stopped)
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one command executed through the command channel.
///
/// This is also the body the command sidecar returns from `POST /rcon`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOutput {
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    pub returncode: i32,
}

/// `GET /start` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartResponse {
    /// `"starting"` when a start request was issued, `"running"` when the
    /// instance was already up.
    pub status: String,
    pub external_ip: String,
    /// `created`, `updated`, `unchanged`, `skipped` or `failed: <reason>`.
    pub dns_update: String,
}

/// `GET /stop` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopResponse {
    /// `"stopping"` or `"already_stopped"`.
    pub status: String,
}

/// `GET /status` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub running: bool,
    pub status: InstanceStatus,
}

/// `GET /ip` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpResponse {
    pub external_ip: Option<String>,
}

/// `GET /players/count` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCountResponse {
    /// `None` when the game server's reply could not be parsed.
    pub players: Option<u32>,
    pub output: String,
}

/// Failure body returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    /// Stable machine-readable error kind, e.g. `start_timeout`.
    pub kind: String,
    pub message: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(kind: &str, message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            kind: kind.to_string(),
            message: message.into(),
        }
    }
}
