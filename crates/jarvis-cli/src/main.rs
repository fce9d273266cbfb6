//! CLI entry point - the composition root.

use anyhow::Context;
use clap::Parser;
use jarvis_cli::{Cli, Commands, handlers, logging};
use jarvis_core::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init(cli.verbose);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting jarvis");

    let settings = Settings::from_env().context("Invalid configuration")?;

    let command = cli.into_command();
    tracing::debug!(?command, "Dispatching command");

    let result = match command {
        Commands::Serve { host, port } => handlers::serve::execute(settings, host, port).await,
        Commands::Voices { language } => handlers::voices::execute(settings, language).await,
        Commands::Models { live_only } => handlers::models::execute(settings, live_only).await,
    };
    if let Err(err) = &result {
        tracing::error!(error = %err, "Command failed");
    }
    result
}
