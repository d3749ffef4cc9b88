//! herald: live-stream announcement daemon.
//! Single-process binary embedding the whole pipeline: poll sources,
//! debounce transitions, plan announcements, post to social targets.

use clap::Parser;

mod announcer;
mod cli;
mod config_file;
mod cycle;
mod dispatch;
mod poll_loop;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let filter = std::env::var("HERALD_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let command = args
        .command
        .unwrap_or_else(|| cli::Command::Run(cli::RunOpts::default()));

    match command {
        cli::Command::Run(opts) => {
            let config = config_file::load(&args.config)?;
            tracing::info!("herald daemon starting");
            poll_loop::run_daemon(config, opts.once).await?;
        }
        cli::Command::Check => {
            config_file::check(&args.config)?;
        }
    }

    Ok(())
}
