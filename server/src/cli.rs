//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// On-demand game server lifecycle
///
/// All settings are read from `HIBERNATE_*` environment variables.
#[derive(Parser)]
#[command(
    name = "hibernate",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve the lifecycle API (/start, /stop, /status, /ip, /rcon, /players/count)
    Serve,

    /// Watch occupancy and reclaim the instance once it has been idle
    Idle,

    /// Serve the in-instance command sidecar that runs RCON commands
    Rcon,
}

impl Cli {
    /// Execute the selected role.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or the server fails.
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Serve => hibernate::app::serve().await,
            Command::Idle => hibernate::app::idle().await,
            Command::Rcon => hibernate::app::rcon().await,
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
