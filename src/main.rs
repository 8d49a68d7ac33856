// ABOUTME: Entry point for the podrecycle daemon.
// ABOUTME: Parses arguments, sets up tracing and signals, then runs the pipeline.

mod cli;

use clap::Parser;
use cli::Cli;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> podrecycle::error::Result<()> {
    let settings = cli.settings().validate()?;
    let cancel = CancellationToken::new();
    podrecycle::app::cancel_on_signals(cancel.clone())?;
    podrecycle::app::run(settings, cancel).await
}
