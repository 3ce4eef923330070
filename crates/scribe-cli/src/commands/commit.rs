use std::process::ExitCode;

use scribe_crypto::hash_bytes;
use scribe_envelope::Envelope;
use scribe_repo::Repository;
use scribe_types::{Digest, Operation};

use crate::cli::CommitArgs;
use crate::error::CliError;

pub fn run(args: CommitArgs) -> Result<ExitCode, CliError> {
    let mut repo = Repository::open(None)?;
    let config = repo.load_config().unwrap_or_default();

    let author_id = args
        .author
        .or(config.author_id)
        .unwrap_or_else(|| "user:anonymous".into());
    let author_role = args
        .role
        .or(config.author_role)
        .unwrap_or_else(|| "unknown".into());
    let process_name = args.process.unwrap_or_else(|| "manual".into());

    let mut env = Envelope::new();
    env.set_author(&author_id, &author_role);
    env.set_process(&process_name, args.version, None);
    if let Some(message) = &args.message {
        env.set_message(message);
    }

    let head = repo.get_head()?;
    if !head.is_zero() {
        env.set_parent(head);
    }

    if let (Some(table), Some(operation)) = (&args.table, &args.operation) {
        let operation: Operation = operation.parse()?;
        let data_digest = args
            .data
            .as_deref()
            .map(|d| hash_bytes(d.as_bytes()))
            .unwrap_or_else(Digest::zero);

        // The before-image is not observable from the command line, so only
        // DELETE records the payload digest on the before side.
        let (before, after) = match operation {
            Operation::Delete => (data_digest, Digest::zero()),
            Operation::Insert | Operation::Update => (Digest::zero(), data_digest),
        };
        env.add_change(
            table,
            operation,
            args.data.as_deref().unwrap_or("{}"),
            before,
            after,
        );
    }

    let id = repo.store_commit(&mut env)?;

    println!(
        "[{}] {}",
        id.short_hex(),
        args.message.as_deref().unwrap_or("(no message)")
    );
    println!(" Author: {author_id} ({author_role})");
    println!(" Process: {process_name}");
    if !env.changes.is_empty() {
        println!(" {} change(s) recorded", env.changes.len());
    }
    Ok(ExitCode::SUCCESS)
}
