pub mod config;
pub mod types;

pub use config::{
    ApiConfig, ChannelConfig, ConfigError, DnsProviderKind, InstanceConfig, MonitorConfig,
    ShutdownPolicy, SidecarConfig,
};
pub use types::*;
