//! Typed error enums for every adapter and service.
//!
//! Adapters raise these; services add context where they can; the API
//! layer maps each variant onto a stable status code through `kind()`.

use thiserror::Error;

// ── Compute provider ──────────────────────────────────────────────────────────

/// Failure talking to the compute provider. Never retried by the adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("compute provider unreachable: {0}")]
    Transport(String),

    #[error("compute provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("compute provider response malformed: {0}")]
    Malformed(String),

    #[error("compute provider credentials unavailable: {0}")]
    Credentials(String),
}

// ── DNS provider ──────────────────────────────────────────────────────────────

/// Failure reconciling the DNS record. Degrades name resolution only.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DnsError {
    #[error("DNS provider unreachable: {0}")]
    Transport(String),

    #[error("DNS provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("DNS provider response malformed: {0}")]
    Malformed(String),

    #[error("{count} A records exist for {name}; refusing to pick one")]
    ReconcileConflict { name: String, count: usize },
}

// ── Command channel ───────────────────────────────────────────────────────────

/// Failure executing a command through the command channel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// Connect failure, timeout, or an unreadable reply.
    #[error("command channel unavailable: {0}")]
    Unavailable(String),

    /// The channel answered with a non-success status.
    #[error("command channel returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

// ── Lifecycle controller ──────────────────────────────────────────────────────

/// Failure of a lifecycle transition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("instance did not reach RUNNING after {attempts} polls; query /status later")]
    StartTimeout { attempts: u32 },

    #[error("instance is RUNNING but has no external address; check its access configuration")]
    NoExternalAddress,
}

impl LifecycleError {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Provider(_) => "provider",
            Self::StartTimeout { .. } => "start_timeout",
            Self::NoExternalAddress => "no_external_address",
        }
    }
}

// ── Command relay gateway ─────────────────────────────────────────────────────

/// Failure of a relayed command.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("instance has no reachable address")]
    InstanceUnreachable,

    #[error("command channel returned HTTP {status}: {body}")]
    RelayFailed { status: u16, body: String },

    #[error("command channel unavailable: {0}")]
    ChannelUnavailable(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl RelayError {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::InstanceUnreachable => "instance_unreachable",
            Self::RelayFailed { .. } => "relay_failed",
            Self::ChannelUnavailable(_) => "channel_unavailable",
            Self::Provider(_) => "provider",
        }
    }
}

impl From<ChannelError> for RelayError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Unavailable(msg) => Self::ChannelUnavailable(msg),
            ChannelError::Rejected { status, body } => Self::RelayFailed { status, body },
        }
    }
}
