//! Domain layer: pure types, validation and decision logic.
//!
//! This module has zero imports from `crate::infra`, `crate::api`,
//! `crate::application`, `tokio`, `reqwest` or `std::fs`.
//! All functions are synchronous and take data in, returning data out.

pub mod auth;
pub mod dns;
pub mod error;
pub mod idle;
pub mod instance;
pub mod occupancy;

pub use auth::BearerSecret;
pub use dns::{DnsRecord, DnsUpdate, NewRecord};
pub use error::{ChannelError, DnsError, LifecycleError, ProviderError, RelayError};
pub use idle::IdleTracker;
pub use instance::{InstanceId, InstanceView};
pub use occupancy::Occupancy;
