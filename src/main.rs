//! Main entry point for the wacz CLI application.
//!
//! Turns one or more WARC files into a WACZ archive.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wacz::cli::{Command, CreateArgs, LogLevel};
use wacz::{Cli, Wacz};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Create(args) => {
            init_logging(args.log_level);
            match create(&args).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    // Only the top-level message; causes are logged at trace level
                    error!("{}", e);
                    error!("WACZ could not be processed.");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

/// Log to stderr at `level`, unless `RUST_LOG` says otherwise
fn init_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn create(args: &CreateArgs) -> anyhow::Result<()> {
    let options = args.to_options()?;
    let mut wacz = Wacz::new(options)?;
    let summary = wacz.process().await?;

    info!(
        warcs = summary.warcs,
        pages = summary.pages,
        entries = summary.entries,
        signed = summary.signed,
        "WACZ file ready: {}",
        summary.output.display()
    );
    Ok(())
}
