//! Development tasks for the rules engine
//!
//! This binary provides development utilities using the cargo-xtask pattern.
//! Run with: `cargo xtask <command>`

mod commands;
mod utils;

use anyhow::Result;
use clap::Parser;
use commands::{Derive, Rest};
use tracing_subscriber::EnvFilter;

/// Development tasks for the rules engine
#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Development tools for the rules engine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Derive a record file and print the snapshot
    Derive(Derive),

    /// Run a rest or repair workflow against a record file
    Rest(Rest),
}

fn main() -> Result<()> {
    // Load .env file if it exists (for RUST_LOG and other env vars)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Derive(cmd) => cmd.execute(),
        Command::Rest(cmd) => cmd.execute(),
    }
}
