use std::env;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod error;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    let default_filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = &cli.path {
        if let Err(e) = env::set_current_dir(path) {
            eprintln!("error: IO: cannot change to directory '{path}': {e}");
            return ExitCode::FAILURE;
        }
    }

    match commands::run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}: {e}", e.kind());
            ExitCode::FAILURE
        }
    }
}
