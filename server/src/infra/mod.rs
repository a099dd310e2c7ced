//! Infrastructure layer: adapters implementing the application ports
//! against Google Cloud, Cloudflare, the command sidecar and the local
//! filesystem.

pub mod activity;
pub mod channel;
pub mod clock;
pub mod cloud_dns;
pub mod cloudflare;
pub mod command_runner;
pub mod config;
pub mod gce;
pub mod google_auth;
