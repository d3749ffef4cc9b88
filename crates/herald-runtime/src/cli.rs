//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "herald", about = "Live-stream announcement daemon")]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true, env = "HERALD_CONFIG", default_value = "herald.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the daemon (poll loop + announcement dispatch)
    Run(RunOpts),
    /// Validate the configuration and preview announcement templates
    Check,
}

#[derive(clap::Args, Default)]
pub struct RunOpts {
    /// Run a single poll cycle and exit (useful for cron-style setups)
    #[arg(long)]
    pub once: bool,
}
