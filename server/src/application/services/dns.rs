//! DNS reconciliation: upsert one `A` record to the instance address.

use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::application::ports::DnsProvider;
use crate::domain::dns::{RecordPlan, plan};
use crate::domain::{DnsError, DnsUpdate, NewRecord};

/// Keeps a single named `A` record pointed at the instance.
#[derive(Clone)]
pub struct DnsReconciler {
    provider: Arc<dyn DnsProvider>,
    ttl: u32,
}

impl DnsReconciler {
    #[must_use]
    pub fn new(provider: Arc<dyn DnsProvider>, ttl: u32) -> Self {
        Self { provider, ttl }
    }

    /// Upsert the `A` record `name` to `address`.
    ///
    /// Only call this with an address resolved from a RUNNING instance.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileConflict` if more than one record matches, or the
    /// provider's error if any list/write fails.
    pub async fn reconcile(&self, name: &str, address: Ipv4Addr) -> Result<DnsUpdate, DnsError> {
        let desired = NewRecord {
            name: name.to_string(),
            content: address.to_string(),
            ttl: self.ttl,
        };
        let existing = self.provider.list_records(name).await?;

        match plan(&existing, &desired)? {
            RecordPlan::Create => {
                self.provider.create_record(&desired).await?;
                tracing::info!(name, %address, "DNS record created");
                Ok(DnsUpdate::Created)
            }
            RecordPlan::Keep => {
                tracing::debug!(name, %address, "DNS record already current");
                Ok(DnsUpdate::Unchanged)
            }
            RecordPlan::Replace { id } => {
                if self.provider.supports_update() {
                    self.provider.update_record(&id, &desired).await?;
                } else {
                    // Two steps: a failure between them leaves no record,
                    // which the next reconcile repairs with a create.
                    self.provider.delete_record(&id).await?;
                    self.provider.create_record(&desired).await?;
                }
                tracing::info!(name, %address, "DNS record updated");
                Ok(DnsUpdate::Updated)
            }
        }
    }
}
