//! DNS record model and the upsert decision.

use std::fmt;

use super::error::DnsError;

/// Record type managed by the reconciler. Fixed: IPv4 address record.
pub const RECORD_TYPE: &str = "A";

/// A record as listed by the DNS provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Provider-specific identifier used for update/delete.
    pub id: String,
    pub name: String,
    pub content: String,
    pub ttl: u32,
}

/// Desired state of the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub name: String,
    pub content: String,
    pub ttl: u32,
}

/// What a reconcile did (or why it did nothing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsUpdate {
    Created,
    Updated,
    Unchanged,
    /// No DNS backend configured.
    Skipped,
    Failed(String),
}

impl fmt::Display for DnsUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Updated => f.write_str("updated"),
            Self::Unchanged => f.write_str("unchanged"),
            Self::Skipped => f.write_str("skipped"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Next write the reconciler has to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordPlan {
    Create,
    Keep,
    Replace { id: String },
}

/// Compare names ignoring a trailing root dot (`mc.example.com.`).
#[must_use]
pub fn same_name(a: &str, b: &str) -> bool {
    a.trim_end_matches('.') == b.trim_end_matches('.')
}

/// Decide how to bring `existing` to `desired`.
///
/// `existing` must already be filtered to records of [`RECORD_TYPE`];
/// records for other names are ignored here as well.
pub fn plan(existing: &[DnsRecord], desired: &NewRecord) -> Result<RecordPlan, DnsError> {
    let matching: Vec<&DnsRecord> = existing
        .iter()
        .filter(|r| same_name(&r.name, &desired.name))
        .collect();
    match matching.as_slice() {
        [] => Ok(RecordPlan::Create),
        [only] if only.content == desired.content && only.ttl == desired.ttl => {
            Ok(RecordPlan::Keep)
        }
        [only] => Ok(RecordPlan::Replace {
            id: only.id.clone(),
        }),
        many => Err(DnsError::ReconcileConflict {
            name: desired.name.clone(),
            count: many.len(),
        }),
    }
}
