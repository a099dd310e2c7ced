//! The managed instance: identity and provider-observed view.

use std::fmt;
use std::net::Ipv4Addr;

use hibernate_common::InstanceStatus;

/// `(project, zone, name)`, opaque beyond equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceId {
    pub project: String,
    pub zone: String,
    pub name: String,
}

impl InstanceId {
    pub fn new(
        project: impl Into<String>,
        zone: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            zone: zone.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.project, self.zone, self.name)
    }
}

/// One observation of the instance from the compute provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceView {
    pub status: InstanceStatus,
    /// First access configuration's address, if one is allocated.
    pub external_ip: Option<Ipv4Addr>,
}

impl InstanceView {
    #[must_use]
    pub fn new(status: InstanceStatus, external_ip: Option<Ipv4Addr>) -> Self {
        Self {
            status,
            external_ip,
        }
    }

    /// Address usable for traffic: only meaningful while running.
    #[must_use]
    pub fn reachable_ip(&self) -> Option<Ipv4Addr> {
        match self.status {
            InstanceStatus::Running => self.external_ip,
            _ => None,
        }
    }
}

/// Map a Compute Engine instance status string onto [`InstanceStatus`].
#[must_use]
pub fn status_from_provider(raw: &str) -> InstanceStatus {
    match raw {
        "PROVISIONING" | "STAGING" => InstanceStatus::Provisioning,
        "RUNNING" => InstanceStatus::Running,
        "STOPPING" | "SUSPENDING" => InstanceStatus::Stopping,
        "STOPPED" | "TERMINATED" | "SUSPENDED" => InstanceStatus::Stopped,
        _ => InstanceStatus::Unknown,
    }
}
