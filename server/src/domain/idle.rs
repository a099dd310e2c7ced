//! Last-active bookkeeping for the idle monitor.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Process-local liveness tracker. `last_active` never decreases.
#[derive(Debug, Clone)]
pub struct IdleTracker {
    last_active: DateTime<Utc>,
    threshold: Duration,
}

impl IdleTracker {
    /// Start tracking at `now`, or at a recovered marker if one exists.
    ///
    /// A marker in the future (clock skew, hand-edited file) is clamped to
    /// `now`. A marker already older than the threshold belongs to an
    /// earlier boot of the instance and is discarded, so a fresh start
    /// always gets a full threshold of grace.
    #[must_use]
    pub fn start(now: DateTime<Utc>, recovered: Option<DateTime<Utc>>, threshold: Duration) -> Self {
        let last_active = recovered
            .map(|marker| marker.min(now))
            .filter(|marker| (now - *marker).to_std().unwrap_or(Duration::ZERO) <= threshold)
            .unwrap_or(now);
        Self {
            last_active,
            threshold,
        }
    }

    #[must_use]
    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    /// Record an active observation. Returns `true` if the marker advanced.
    pub fn record_activity(&mut self, now: DateTime<Utc>) -> bool {
        if now > self.last_active {
            self.last_active = now;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_active).to_std().unwrap_or(Duration::ZERO)
    }

    /// Strictly more than the threshold has passed without activity.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.idle_for(now) > self.threshold
    }
}
