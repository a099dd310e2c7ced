//! Instance lifecycle: start, stop, delete, status, address.
//!
//! The controller holds no instance state between calls. Every transition
//! is decided from a fresh provider query, since another operator may be
//! driving the same instance from the provider console.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use hibernate_common::InstanceStatus;

use super::dns::DnsReconciler;
use crate::application::ports::ComputeProvider;
use crate::domain::{DnsUpdate, InstanceId, InstanceView, LifecycleError};

/// Bounded wait for the instance to report RUNNING: `attempts` polls spaced
/// `interval` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

/// Result of a successful `start()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    /// `false` when the instance was already running and no start request
    /// was sent.
    pub requested: bool,
    pub external_ip: Ipv4Addr,
    pub dns: DnsUpdate,
}

impl StartOutcome {
    #[must_use]
    pub fn status_label(&self) -> &'static str {
        if self.requested { "starting" } else { "running" }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Requested,
    AlreadyStopped,
}

impl StopOutcome {
    #[must_use]
    pub fn status_label(self) -> &'static str {
        match self {
            Self::Requested => "stopping",
            Self::AlreadyStopped => "already_stopped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Requested,
    AlreadyGone,
}

struct DnsBinding {
    reconciler: DnsReconciler,
    name: String,
}

/// Drives start/stop transitions of the single managed instance.
#[derive(Clone)]
pub struct LifecycleController {
    compute: Arc<dyn ComputeProvider>,
    instance: InstanceId,
    poll: PollPolicy,
    dns: Option<Arc<DnsBinding>>,
}

impl LifecycleController {
    #[must_use]
    pub fn new(compute: Arc<dyn ComputeProvider>, instance: InstanceId, poll: PollPolicy) -> Self {
        Self {
            compute,
            instance,
            poll,
            dns: None,
        }
    }

    /// Reconcile `name` to the instance address after every start.
    #[must_use]
    pub fn with_dns(mut self, reconciler: DnsReconciler, name: impl Into<String>) -> Self {
        self.dns = Some(Arc::new(DnsBinding {
            reconciler,
            name: name.into(),
        }));
        self
    }

    #[must_use]
    pub fn instance(&self) -> &InstanceId {
        &self.instance
    }

    /// Start the instance, wait for RUNNING, and point DNS at it.
    ///
    /// Idempotent: an already running instance gets no start request, only
    /// the address/DNS steps. A DNS failure does not fail the call; it is
    /// reported in [`StartOutcome::dns`].
    ///
    /// # Errors
    ///
    /// - `Provider` if any provider call fails.
    /// - `StartTimeout` if RUNNING is not observed within the poll policy.
    /// - `NoExternalAddress` if the instance runs without an address.
    pub async fn start(&self) -> Result<StartOutcome, LifecycleError> {
        let current = self.compute.get(&self.instance).await?;

        let (requested, view) = match current {
            Some(view) if view.status == InstanceStatus::Running => {
                tracing::info!(instance = %self.instance, "instance already running");
                (false, view)
            }
            _ => {
                self.compute.start(&self.instance).await?;
                tracing::info!(instance = %self.instance, "start requested");
                (true, self.wait_until_running().await?)
            }
        };

        let external_ip = view.external_ip.ok_or(LifecycleError::NoExternalAddress)?;
        let dns = self.reconcile_dns(external_ip).await;

        Ok(StartOutcome {
            requested,
            external_ip,
            dns,
        })
    }

    /// Request a stop. Does not wait for STOPPED.
    ///
    /// # Errors
    ///
    /// Returns `Provider` if the query or the stop request fails.
    pub async fn stop(&self) -> Result<StopOutcome, LifecycleError> {
        match self.compute.get(&self.instance).await? {
            None => {
                tracing::info!(instance = %self.instance, "instance not provisioned; nothing to stop");
                Ok(StopOutcome::AlreadyStopped)
            }
            Some(view) if view.status.is_halted() => {
                tracing::info!(instance = %self.instance, status = %view.status, "instance already stopped");
                Ok(StopOutcome::AlreadyStopped)
            }
            Some(_) => {
                self.compute.stop(&self.instance).await?;
                tracing::info!(instance = %self.instance, "stop requested");
                Ok(StopOutcome::Requested)
            }
        }
    }

    /// Request deletion of the instance.
    ///
    /// # Errors
    ///
    /// Returns `Provider` if the query or the delete request fails.
    pub async fn delete(&self) -> Result<DeleteOutcome, LifecycleError> {
        if self.compute.get(&self.instance).await?.is_none() {
            tracing::info!(instance = %self.instance, "instance already deleted");
            return Ok(DeleteOutcome::AlreadyGone);
        }
        self.compute.delete(&self.instance).await?;
        tracing::warn!(instance = %self.instance, "delete requested");
        Ok(DeleteOutcome::Requested)
    }

    /// Current status; `Unknown` when the provider has no record.
    ///
    /// # Errors
    ///
    /// Returns `Provider` if the query fails.
    pub async fn status(&self) -> Result<InstanceStatus, LifecycleError> {
        Ok(self
            .compute
            .get(&self.instance)
            .await?
            .map_or(InstanceStatus::Unknown, |view| view.status))
    }

    /// External address while running, `None` otherwise.
    ///
    /// # Errors
    ///
    /// Returns `Provider` if the query fails.
    pub async fn external_ip(&self) -> Result<Option<Ipv4Addr>, LifecycleError> {
        Ok(self
            .compute
            .get(&self.instance)
            .await?
            .and_then(|view| view.reachable_ip()))
    }

    async fn wait_until_running(&self) -> Result<InstanceView, LifecycleError> {
        for attempt in 1..=self.poll.attempts {
            tokio::time::sleep(self.poll.interval).await;
            match self.compute.get(&self.instance).await? {
                Some(view) if view.status == InstanceStatus::Running => {
                    tracing::info!(instance = %self.instance, attempt, "instance running");
                    return Ok(view);
                }
                other => {
                    let status = other.map_or(InstanceStatus::Unknown, |v| v.status);
                    tracing::debug!(instance = %self.instance, attempt, %status, "waiting for RUNNING");
                }
            }
        }
        tracing::warn!(
            instance = %self.instance,
            attempts = self.poll.attempts,
            "instance did not reach RUNNING in time"
        );
        Err(LifecycleError::StartTimeout {
            attempts: self.poll.attempts,
        })
    }

    async fn reconcile_dns(&self, address: Ipv4Addr) -> DnsUpdate {
        let Some(binding) = &self.dns else {
            return DnsUpdate::Skipped;
        };
        match binding.reconciler.reconcile(&binding.name, address).await {
            Ok(update) => update,
            Err(err) => {
                tracing::error!(name = %binding.name, %address, error = %err, "DNS update failed; instance stays up");
                DnsUpdate::Failed(err.to_string())
            }
        }
    }
}
