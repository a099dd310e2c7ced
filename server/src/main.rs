//! hibernate: start, reclaim and administer an on-demand game server VM

#![cfg_attr(test, allow(clippy::expect_used))]

use clap::Parser;

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    cli::init_tracing();
    if let Err(e) = cli.run().await {
        tracing::error!(error = %format!("{e:#}"), "exiting");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
