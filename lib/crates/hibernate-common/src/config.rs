//! Environment-driven configuration.
//!
//! Every struct here is deserialized with `envy::prefixed("HIBERNATE_")`, so
//! each field maps to `HIBERNATE_<FIELD>`. The structs are loaded
//! independently; a process only loads the ones it needs.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Rejected configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error(
        "poll interval ({poll}s) must be shorter than the idle threshold ({threshold}s)"
    )]
    PollNotBelowThreshold { poll: u64, threshold: u64 },

    #[error("{key} is required when HIBERNATE_DNS_PROVIDER={provider}")]
    MissingDnsSetting { key: &'static str, provider: &'static str },
}

// ── Instance identity ─────────────────────────────────────────────────────────

/// Identity of the managed instance and how to reach the compute provider.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceConfig {
    pub project: String,
    pub zone: String,
    pub instance: String,

    /// Timeout applied to every compute provider call.
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,

    /// Static OAuth access token. When unset the GCE metadata server is used.
    pub access_token: Option<String>,
}

impl InstanceConfig {
    #[must_use]
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

fn default_provider_timeout() -> u64 {
    30
}

// ── Command channel ───────────────────────────────────────────────────────────

/// Shared settings for talking to the command sidecar on the instance.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_channel_port")]
    pub channel_port: u16,

    /// Shared secret sent as `X-API-Key`.
    pub channel_secret: Option<String>,

    /// Path to a file holding the shared secret (Docker / Secret Manager mount).
    pub channel_secret_file: Option<String>,

    #[serde(default = "default_channel_timeout")]
    pub channel_timeout_secs: u64,
}

impl ChannelConfig {
    #[must_use]
    pub fn channel_timeout(&self) -> Duration {
        Duration::from_secs(self.channel_timeout_secs)
    }
}

fn default_channel_port() -> u16 {
    8081
}

fn default_channel_timeout() -> u64 {
    10
}

// ── API server ────────────────────────────────────────────────────────────────

/// Which DNS backend the API server reconciles the instance address into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DnsProviderKind {
    Cloudflare,
    CloudDns,
    /// DNS reconciliation disabled.
    None,
}

impl DnsProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cloudflare => "cloudflare",
            Self::CloudDns => "cloud-dns",
            Self::None => "none",
        }
    }
}

/// HTTP API server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Bearer secret guarding `/stop` and `/rcon`.
    pub api_token: Option<String>,
    pub api_token_file: Option<String>,

    #[serde(default = "default_dns_provider")]
    pub dns_provider: DnsProviderKind,

    /// Cloudflare zone id, or Cloud DNS managed zone name.
    pub dns_zone: Option<String>,

    /// Fully qualified record name, e.g. `mc.example.com`.
    pub dns_name: Option<String>,

    #[serde(default = "default_dns_ttl")]
    pub dns_ttl: u32,

    /// Cloudflare API token.
    pub dns_token: Option<String>,
    pub dns_token_file: Option<String>,

    /// Cloud DNS project; defaults to the instance project.
    pub dns_project: Option<String>,

    #[serde(default = "default_start_poll_attempts")]
    pub start_poll_attempts: u32,

    #[serde(default = "default_start_poll_interval")]
    pub start_poll_interval_secs: u64,
}

impl ApiConfig {
    #[must_use]
    pub fn start_poll_interval(&self) -> Duration {
        Duration::from_secs(self.start_poll_interval_secs)
    }

    /// Check value ranges and the settings the chosen DNS backend needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_poll_attempts == 0 {
            return Err(ConfigError::Zero("HIBERNATE_START_POLL_ATTEMPTS"));
        }
        if self.start_poll_interval_secs == 0 {
            return Err(ConfigError::Zero("HIBERNATE_START_POLL_INTERVAL_SECS"));
        }
        if self.dns_provider == DnsProviderKind::None {
            return Ok(());
        }
        let provider = self.dns_provider.as_str();
        if self.dns_zone.is_none() {
            return Err(ConfigError::MissingDnsSetting {
                key: "HIBERNATE_DNS_ZONE",
                provider,
            });
        }
        if self.dns_name.is_none() {
            return Err(ConfigError::MissingDnsSetting {
                key: "HIBERNATE_DNS_NAME",
                provider,
            });
        }
        if self.dns_provider == DnsProviderKind::Cloudflare
            && self.dns_token.is_none()
            && self.dns_token_file.is_none()
        {
            return Err(ConfigError::MissingDnsSetting {
                key: "HIBERNATE_DNS_TOKEN",
                provider,
            });
        }
        Ok(())
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_dns_provider() -> DnsProviderKind {
    DnsProviderKind::Cloudflare
}

fn default_dns_ttl() -> u32 {
    60
}

fn default_start_poll_attempts() -> u32 {
    30
}

fn default_start_poll_interval() -> u64 {
    2
}

// ── Idle monitor ──────────────────────────────────────────────────────────────

/// What the idle monitor does to the instance once it is reclaimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShutdownPolicy {
    StopOnly,
    StopAndDelete,
}

/// Idle monitor configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_idle_threshold")]
    pub idle_threshold_secs: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_shutdown_policy")]
    pub shutdown_policy: ShutdownPolicy,

    /// Time the game server gets to persist its world after the graceful
    /// stop command.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,

    /// Host the occupancy probe talks to. The literal `instance` resolves the
    /// instance's external address through the compute provider.
    #[serde(default = "default_channel_host")]
    pub channel_host: String,

    /// File holding the persisted last-active marker. Unset means every run
    /// starts cold.
    pub activity_file: Option<String>,
}

impl MonitorConfig {
    #[must_use]
    pub fn idle_threshold(&self) -> Duration {
        Duration::from_secs(self.idle_threshold_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Zero("HIBERNATE_POLL_INTERVAL_SECS"));
        }
        if self.poll_interval_secs >= self.idle_threshold_secs {
            return Err(ConfigError::PollNotBelowThreshold {
                poll: self.poll_interval_secs,
                threshold: self.idle_threshold_secs,
            });
        }
        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            idle_threshold_secs: default_idle_threshold(),
            poll_interval_secs: default_poll_interval(),
            shutdown_policy: default_shutdown_policy(),
            shutdown_grace_secs: default_shutdown_grace(),
            channel_host: default_channel_host(),
            activity_file: None,
        }
    }
}

fn default_idle_threshold() -> u64 {
    300
}

fn default_poll_interval() -> u64 {
    30
}

fn default_shutdown_policy() -> ShutdownPolicy {
    ShutdownPolicy::StopOnly
}

fn default_shutdown_grace() -> u64 {
    120
}

fn default_channel_host() -> String {
    "127.0.0.1".to_string()
}

// ── Command sidecar ───────────────────────────────────────────────────────────

/// Configuration of the command sidecar running next to the game server.
#[derive(Debug, Clone, Deserialize)]
pub struct SidecarConfig {
    #[serde(default = "default_sidecar_listen_addr")]
    pub sidecar_listen_addr: String,

    /// Program invoked as `<program> <command>`.
    #[serde(default = "default_rcon_program")]
    pub rcon_program: String,

    #[serde(default = "default_rcon_timeout")]
    pub rcon_timeout_secs: u64,
}

impl SidecarConfig {
    #[must_use]
    pub fn rcon_timeout(&self) -> Duration {
        Duration::from_secs(self.rcon_timeout_secs)
    }
}

fn default_sidecar_listen_addr() -> String {
    "0.0.0.0:8081".to_string()
}

fn default_rcon_program() -> String {
    "rcon-cli".to_string()
}

fn default_rcon_timeout() -> u64 {
    30
}
