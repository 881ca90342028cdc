//! checkrun CLI entrypoint

use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use checkrun::cli::Cli;

/// Exit status for configuration and pipeline assembly errors
const EXIT_USAGE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing; stage output owns stdout, logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.execute().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("checkrun: {:#}", e);
            ExitCode::from(EXIT_USAGE)
        }
    }
}
