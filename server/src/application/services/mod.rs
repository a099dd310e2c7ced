//! Application services: the lifecycle controller, DNS reconciler, command
//! relay gateway and idle monitor.
//!
//! Each module imports only from `crate::domain` and
//! `crate::application::ports`.

pub mod dns;
pub mod idle_monitor;
pub mod lifecycle;
pub mod relay;

#[cfg(test)]
pub(crate) mod test_support;

pub use dns::DnsReconciler;
pub use idle_monitor::{IdleMonitor, IdleSettings, ProbeTarget, ShutdownReport};
pub use lifecycle::{DeleteOutcome, LifecycleController, PollPolicy, StartOutcome, StopOutcome};
pub use relay::RelayGateway;
