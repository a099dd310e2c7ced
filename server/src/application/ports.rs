//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! They are object-safe so one handle can be shared as `Arc<dyn Port>`
//! between HTTP handlers and substituted with stubs in tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hibernate_common::ChannelOutput;

use crate::domain::{
    ChannelError, DnsError, DnsRecord, InstanceId, InstanceView, NewRecord, ProviderError,
};

// ── Compute provider ──────────────────────────────────────────────────────────

/// Instance operations against the compute provider.
///
/// Every call is a bounded remote call. Adapters normalize shape only; they
/// do not retry or interpret.
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// Request the instance to start. Returns once the request is accepted.
    async fn start(&self, id: &InstanceId) -> Result<(), ProviderError>;
    /// Request the instance to stop. Returns once the request is accepted.
    async fn stop(&self, id: &InstanceId) -> Result<(), ProviderError>;
    /// Request the instance to be deleted. Not-found is not an error.
    async fn delete(&self, id: &InstanceId) -> Result<(), ProviderError>;
    /// Current status and address, or `None` when the provider has no record
    /// of the instance.
    async fn get(&self, id: &InstanceId) -> Result<Option<InstanceView>, ProviderError>;
}

// ── DNS provider ──────────────────────────────────────────────────────────────

/// Record operations against the DNS provider, scoped to one zone and to `A`
/// records.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List `A` records named `name`.
    async fn list_records(&self, name: &str) -> Result<Vec<DnsRecord>, DnsError>;
    async fn create_record(&self, record: &NewRecord) -> Result<(), DnsError>;
    /// Replace the record `id` in place. Only called when
    /// [`supports_update`](Self::supports_update) is `true`.
    async fn update_record(&self, id: &str, record: &NewRecord) -> Result<(), DnsError>;
    async fn delete_record(&self, id: &str) -> Result<(), DnsError>;
    /// Whether `update_record` is a single atomic call. When `false` the
    /// reconciler falls back to delete-then-create.
    fn supports_update(&self) -> bool {
        true
    }
}

// ── Command channel ───────────────────────────────────────────────────────────

/// Administrative command endpoint running on the instance.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// Execute `command` verbatim on the channel at `host`.
    async fn execute(&self, host: &str, command: &str) -> Result<ChannelOutput, ChannelError>;
}

// ── Idle state persistence ────────────────────────────────────────────────────

/// Durable single-slot store for the idle monitor's last-active marker.
///
/// The schema is one integer: unix seconds.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Load the marker, returning `None` if nothing was persisted.
    async fn load(&self) -> Result<Option<i64>>;
    /// Overwrite the marker.
    async fn save(&self, unix_secs: i64) -> Result<()>;
}

// ── Time ──────────────────────────────────────────────────────────────────────

/// Wall-clock source, consistent within one monitor run.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
