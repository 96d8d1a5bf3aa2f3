//! dirload - load a directory tree into one structured document.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Error
//! - 130: Interrupted

use std::io::Write;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use dirload::LoadError;
use dirload_cli::commands::{run_file, run_load};
use dirload_cli::{Cli, Commands, SettingsProvider};

/// Exit code returned when the load was interrupted.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level
    let filter = if cli.debug {
        EnvFilter::new("dirload=debug,dirload_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Interrupted, cancelling load");
            interrupt.cancel();
        }
    });

    let exit_code = result_to_exit(dispatch_command(cli, token).await);
    std::process::exit(exit_code);
}

/// Dispatch a parsed CLI to the appropriate command handler.
async fn dispatch_command(cli: Cli, token: CancellationToken) -> anyhow::Result<()> {
    let settings = SettingsProvider::new(cli.config.clone()).load(&cli.command.overrides())?;
    let output = match &cli.command {
        Commands::Load { dir, .. } => run_load(dir, &settings, token).await?,
        Commands::File { file, .. } => run_file(file, &settings, token).await?,
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    if !output.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    Ok(())
}

/// Convert a command result to an exit code.
fn result_to_exit(result: anyhow::Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            if e.downcast_ref::<LoadError>().is_some_and(LoadError::is_cancelled) {
                eprintln!("Interrupted");
                return INTERRUPTED_EXIT_CODE;
            }
            eprintln!("Error: {:#}", e);
            1
        }
    }
}
