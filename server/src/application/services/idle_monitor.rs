//! Idle monitor: poll occupancy, track last activity, reclaim when idle.
//!
//! A single sequential loop. Probe failures are logged and never counted as
//! idleness. Once the threshold is exceeded the monitor runs the shutdown
//! sequence exactly once and returns.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use hibernate_common::ShutdownPolicy;

use super::lifecycle::LifecycleController;
use crate::application::ports::{ActivityStore, Clock, CommandChannel};
use crate::domain::occupancy::{LIST_COMMAND, STOP_COMMAND};
use crate::domain::{IdleTracker, Occupancy};

/// Where the command channel is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeTarget {
    /// A fixed host, typically `127.0.0.1` when running on the instance.
    Fixed(String),
    /// The instance's current external address, looked up on every call.
    Instance,
}

impl ProbeTarget {
    /// `instance` selects [`ProbeTarget::Instance`]; anything else is a host.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("instance") {
            Self::Instance
        } else {
            Self::Fixed(value.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IdleSettings {
    pub threshold: Duration,
    pub poll_interval: Duration,
    /// Time given to the game server to persist state after the graceful
    /// stop command.
    pub grace: Duration,
    pub policy: ShutdownPolicy,
}

/// What the one-shot shutdown sequence managed to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub idle_for: Duration,
    pub graceful_stop: bool,
    pub reclaimed: bool,
}

pub struct IdleMonitor {
    channel: Arc<dyn CommandChannel>,
    lifecycle: LifecycleController,
    store: Arc<dyn ActivityStore>,
    clock: Arc<dyn Clock>,
    target: ProbeTarget,
    settings: IdleSettings,
}

impl IdleMonitor {
    #[must_use]
    pub fn new(
        channel: Arc<dyn CommandChannel>,
        lifecycle: LifecycleController,
        store: Arc<dyn ActivityStore>,
        clock: Arc<dyn Clock>,
        target: ProbeTarget,
        settings: IdleSettings,
    ) -> Self {
        Self {
            channel,
            lifecycle,
            store,
            clock,
            target,
            settings,
        }
    }

    /// Run until the instance is reclaimed.
    pub async fn run(&self) -> ShutdownReport {
        let mut tracker = self.start_tracker().await;
        tracing::info!(
            last_active = %tracker.last_active(),
            threshold_secs = self.settings.threshold.as_secs(),
            poll_secs = self.settings.poll_interval.as_secs(),
            "idle monitor started"
        );

        loop {
            let now = self.clock.now();
            match self.probe().await {
                Ok(occupancy) => {
                    tracing::info!(players = ?occupancy.count(), "occupancy probed");
                    if occupancy.is_active() && tracker.record_activity(now) {
                        self.persist(now).await;
                    }
                    // Expiry is only judged on a successful probe.
                    if tracker.is_expired(now) {
                        return self.shutdown(tracker.idle_for(now)).await;
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %format!("{err:#}"), "occupancy probe failed; not counted as idle");
                }
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    async fn start_tracker(&self) -> IdleTracker {
        let recovered = match self.store.load().await {
            Ok(marker) => marker.and_then(|secs| DateTime::from_timestamp(secs, 0)),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "cannot read last-active marker; starting cold");
                None
            }
        };
        IdleTracker::start(self.clock.now(), recovered, self.settings.threshold)
    }

    async fn persist(&self, now: DateTime<Utc>) {
        if let Err(err) = self.store.save(now.timestamp()).await {
            tracing::warn!(error = %format!("{err:#}"), "cannot persist last-active marker");
        }
    }

    async fn host(&self) -> Result<String> {
        match &self.target {
            ProbeTarget::Fixed(host) => Ok(host.clone()),
            ProbeTarget::Instance => self
                .lifecycle
                .external_ip()
                .await?
                .map(|ip| ip.to_string())
                .context("instance has no reachable address"),
        }
    }

    async fn probe(&self) -> Result<Occupancy> {
        let host = self.host().await?;
        let output = self.channel.execute(&host, LIST_COMMAND).await?;
        if output.returncode != 0 {
            bail!(
                "list command exited with {}: {}",
                output.returncode,
                output.stderr.trim()
            );
        }
        Ok(Occupancy::parse(&output.stdout))
    }

    async fn graceful_stop(&self) -> Result<()> {
        let host = self.host().await?;
        self.channel.execute(&host, STOP_COMMAND).await?;
        Ok(())
    }

    async fn reclaim(&self) -> Result<()> {
        match self.settings.policy {
            ShutdownPolicy::StopOnly => {
                self.lifecycle.stop().await?;
            }
            ShutdownPolicy::StopAndDelete => {
                self.lifecycle.delete().await?;
            }
        }
        Ok(())
    }

    async fn shutdown(&self, idle_for: Duration) -> ShutdownReport {
        tracing::info!(
            idle_secs = idle_for.as_secs(),
            policy = ?self.settings.policy,
            "idle threshold exceeded; reclaiming instance"
        );

        let graceful_stop = match self.graceful_stop().await {
            Ok(()) => {
                tracing::info!(grace_secs = self.settings.grace.as_secs(), "graceful stop sent; waiting for world save");
                tokio::time::sleep(self.settings.grace).await;
                true
            }
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "graceful stop failed; continuing with instance stop");
                false
            }
        };

        let reclaimed = match self.reclaim().await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), instance = %self.lifecycle.instance(), "failed to reclaim instance");
                false
            }
        };

        ShutdownReport {
            idle_for,
            graceful_stop,
            reclaimed,
        }
    }
}
