use std::process::ExitCode;

use colored::Colorize;

use scribe_cdc::{ingest, CdcMode, Monitor, MonitorConfig};
use scribe_repo::Repository;

use crate::cli::WatchArgs;
use crate::error::CliError;

pub fn run(args: WatchArgs) -> Result<ExitCode, CliError> {
    let mut repo = Repository::open(None)?;
    let config = repo.load_config().unwrap_or_default();

    let connection = args
        .connection
        .or_else(|| config.pg_connection_string.clone())
        .ok_or_else(|| {
            CliError::InvalidArg(
                "no PostgreSQL connection string specified; \
                 use --connection or set pg_connection_string in config"
                    .into(),
            )
        })?;

    let tables = match &args.tables {
        Some(spec) => parse_tables(spec),
        None => config.watched_tables.clone(),
    };

    let mode: CdcMode = args.mode.parse().map_err(CliError::Cdc)?;

    let mut monitor_config = MonitorConfig::new(connection);
    monitor_config.mode = mode;
    monitor_config.tables = tables;
    monitor_config.poll_interval_ms = args.interval;
    monitor_config.slot_name = args.slot;

    let mut monitor = Monitor::new(monitor_config);
    let mode_label = match mode {
        CdcMode::Logical => "logical replication",
        CdcMode::Trigger => "trigger-based",
    };

    if args.setup {
        println!(
            "Setting up {mode_label} CDC for {} table(s)...",
            monitor.config().tables.len()
        );
        monitor.setup()?;
        println!("Setup complete!");
        return Ok(ExitCode::SUCCESS);
    }

    if args.cleanup {
        println!("Cleaning up CDC infrastructure...");
        monitor.cleanup()?;
        println!("Cleanup complete!");
        return Ok(ExitCode::SUCCESS);
    }

    println!("Setting up {mode_label} CDC...");
    monitor.setup()?;

    let stop = monitor.stop_handle();
    ctrlc::set_handler(move || {
        println!("\nStopping monitor...");
        stop.stop();
    })?;

    println!(
        "Monitoring {} table(s) for changes (Ctrl+C to stop)...",
        monitor.config().tables.len()
    );
    for table in &monitor.config().tables {
        println!("  - {table}");
    }
    println!();

    monitor.start(|change| {
        println!(
            "[{}] {} on {}",
            change.operation.to_string().cyan(),
            change.table_name,
            change.primary_key_json
        );
        match ingest::record_change(&mut repo, &config, change) {
            Ok(id) => println!("  -> Committed: {}", id.short_hex().yellow()),
            Err(e) => eprintln!("  {} {e}", "!! commit failed:".red()),
        }
    })?;

    println!("Shutting down...");
    Ok(ExitCode::SUCCESS)
}

/// Split a comma-separated table list, trimming whitespace and dropping
/// empty entries.
fn parse_tables(spec: &str) -> Vec<String> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_list_parses_with_whitespace() {
        assert_eq!(
            parse_tables("orders, customers ,invoices"),
            vec!["orders", "customers", "invoices"]
        );
    }

    #[test]
    fn empty_entries_are_dropped() {
        assert_eq!(parse_tables("orders,,customers,"), vec!["orders", "customers"]);
        assert!(parse_tables("").is_empty());
        assert!(parse_tables(" , ").is_empty());
    }
}
