//! Root CLI parser with global options.

use clap::Parser;

use crate::commands::Commands;

/// Real-time voice assistant bridge.
#[derive(Debug, Parser)]
#[command(name = "jarvis")]
#[command(about = "Full-duplex voice bridge between a WebSocket client and a live model")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The subcommand to run; `serve` when none was given.
    #[must_use]
    pub fn into_command(self) -> Commands {
        self.command.unwrap_or_else(|| {
            tracing::debug!("No subcommand given, defaulting to serve");
            Commands::Serve {
                host: None,
                port: None,
            }
        })
    }
}
