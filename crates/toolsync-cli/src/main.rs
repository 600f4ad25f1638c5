//! toolsync CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use toolsync_cli::console::ConsoleReporter;
use toolsync_cli::{Cli, Commands, cmd};
use toolsync_core::{NullReporter, Reporter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if cli.quiet {
        run(cli, NullReporter).await
    } else {
        run(cli, ConsoleReporter).await
    }
}

async fn run<R: Reporter + Clone + Send + Sync + 'static>(cli: Cli, reporter: R) -> Result<()> {
    match cli.command {
        Commands::Sync { target } => cmd::sync::sync(&cli.config, &cli.state, target, reporter).await,
        Commands::List => cmd::list::list(&cli.state),
    }
}
