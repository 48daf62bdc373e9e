//! revcache CLI entry point.
//!
//! Parses arguments, installs logging on stderr and dispatches to commands.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod commands;
mod maps;

use args::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 0 = warn, 1 = info, 2+ = debug; RUST_LOG overrides
    let default = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Fetch(args) => commands::fetch(args).await,
        Commands::Activate => commands::activate().await,
        Commands::Keys(args) => commands::keys(args).await,
        Commands::Clear(args) => commands::clear(args).await,
        Commands::GenMaps(args) => commands::gen_maps(&args),
    }
}
