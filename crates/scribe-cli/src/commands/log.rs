use std::process::ExitCode;

use chrono::{DateTime, Local};
use colored::Colorize;

use scribe_envelope::Envelope;
use scribe_repo::Repository;
use scribe_types::Digest;

use crate::cli::LogArgs;
use crate::error::CliError;

pub fn run(args: LogArgs) -> Result<ExitCode, CliError> {
    let repo = Repository::open(None)?;

    let start = match &args.commit {
        Some(hex) => Some(
            Digest::from_hex(hex)
                .map_err(|_| CliError::InvalidArg(format!("invalid commit hash '{hex}'")))?,
        ),
        None => None,
    };

    let limit = if args.limit == 0 { 100 } else { args.limit };
    let history = repo.get_history(start.as_ref(), limit)?;

    if history.is_empty() {
        if args.json {
            println!("[]");
        } else {
            println!("No commits found");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut shown = Vec::new();
    for id in &history {
        let Some(env) = repo.load_commit(id)? else {
            continue;
        };

        if let Some(author) = &args.author {
            if !env
                .author
                .id
                .as_deref()
                .is_some_and(|id| id.contains(author.as_str()))
            {
                continue;
            }
        }
        if let Some(process) = &args.process {
            if !env
                .process
                .name
                .as_deref()
                .is_some_and(|name| name.contains(process.as_str()))
            {
                continue;
            }
        }
        shown.push(env);
    }

    if args.json {
        let values: Vec<serde_json::Value> = shown
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()
            .map_err(scribe_envelope::EnvelopeError::from)?;
        println!("{}", serde_json::to_string_pretty(&values).unwrap_or_default());
    } else if args.oneline {
        for env in &shown {
            print_oneline(env);
        }
    } else {
        for env in &shown {
            print_full(env);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_oneline(env: &Envelope) {
    let author = env
        .author
        .id
        .as_deref()
        .map(|id| format!("({id}) "))
        .unwrap_or_default();
    println!(
        "{} {}{}",
        env.commit_id.short_hex().yellow(),
        author,
        env.message.as_deref().unwrap_or("(no message)")
    );
}

fn print_full(env: &Envelope) {
    println!("{}", format!("commit {}", env.commit_id.to_hex()).yellow());

    if !env.parent_id.is_zero() {
        println!("Parent: {}", env.parent_id.to_hex());
    }

    let mut author = env.author.id.clone().unwrap_or_else(|| "(unknown)".into());
    if let Some(role) = &env.author.role {
        author.push_str(&format!(" <{role}>"));
    }
    if let Some(email) = &env.author.email {
        author.push_str(&format!(" ({email})"));
    }
    println!("Author: {author}");

    let mut process = env.process.name.clone().unwrap_or_else(|| "(unknown)".into());
    if let Some(version) = &env.process.version {
        process.push_str(&format!(" {version}"));
    }
    if let Some(params) = &env.process.params {
        process.push_str(&format!(" {params}"));
    }
    println!("Process: {process}");

    println!("Date:   {}", format_timestamp(env.timestamp));

    if let Some(message) = &env.message {
        println!("\n    {message}");
    }

    if !env.changes.is_empty() {
        println!("\n    Changes ({}):", env.changes.len());
        for change in env.changes.iter().take(5) {
            println!(
                "      - {} {} {}",
                change.operation, change.table_name, change.primary_key
            );
        }
        if env.changes.len() > 5 {
            println!("      ... and {} more", env.changes.len() - 5);
        }
    }

    println!();
}

fn format_timestamp(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|utc| {
            utc.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| ts.to_string())
}
