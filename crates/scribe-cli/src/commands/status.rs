use std::process::ExitCode;

use scribe_repo::Repository;

use crate::cli::StatusArgs;
use crate::error::CliError;

pub fn run(args: StatusArgs) -> Result<ExitCode, CliError> {
    let repo = Repository::open(None)?;
    let head = repo.get_head()?;

    if args.porcelain {
        if head.is_zero() {
            println!("head (none)");
        } else {
            println!("head {}", head.to_hex());
        }
        return Ok(ExitCode::SUCCESS);
    }

    println!("On repository: {}", repo.root().display());

    if head.is_zero() {
        println!("\nNo commits yet");
    } else {
        println!("\nHEAD: {}...", head.short_hex());
        if let Some(env) = repo.load_commit(&head)? {
            println!("\nLatest commit:");
            let mut author = env.author.id.clone().unwrap_or_else(|| "(unknown)".into());
            if let Some(role) = &env.author.role {
                author.push_str(&format!(" ({role})"));
            }
            println!("  Author:  {author}");

            let mut process = env.process.name.clone().unwrap_or_else(|| "(unknown)".into());
            if let Some(version) = &env.process.version {
                process.push_str(&format!(" {version}"));
            }
            println!("  Process: {process}");

            if let Some(message) = &env.message {
                println!("  Message: {message}");
            }
            println!("  Changes: {}", env.changes.len());
        }
    }

    if let Ok(config) = repo.load_config() {
        println!("\nConfiguration:");
        let mut author = config
            .author_id
            .clone()
            .unwrap_or_else(|| "(not set)".into());
        if let Some(role) = &config.author_role {
            author.push_str(&format!(" ({role})"));
        }
        println!("  Default author: {author}");

        if config.pg_connection_string.is_some() {
            println!("  PostgreSQL: configured");
            if !config.watched_tables.is_empty() {
                println!("  Watched tables: {}", config.watched_tables.join(", "));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
