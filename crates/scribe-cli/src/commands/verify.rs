use std::process::ExitCode;

use colored::Colorize;

use scribe_repo::Repository;
use scribe_types::Digest;

use crate::cli::VerifyArgs;
use crate::error::CliError;

/// Upper bound on a HEAD-reachable verification walk.
const VERIFY_HISTORY_LIMIT: usize = 1000;

pub fn run(args: VerifyArgs) -> Result<ExitCode, CliError> {
    let repo = Repository::open(None)?;

    let ids = if args.full {
        repo.all_commits()?
    } else {
        let start = match &args.commit {
            Some(hex) => Digest::from_hex(hex)
                .map_err(|_| CliError::InvalidArg(format!("invalid commit hash '{hex}'")))?,
            None => repo.get_head()?,
        };
        if start.is_zero() {
            println!("Repository is empty (no commits to verify)");
            return Ok(ExitCode::SUCCESS);
        }
        repo.get_history(Some(&start), VERIFY_HISTORY_LIMIT)?
    };

    println!("Verifying repository integrity...");
    if args.verbose {
        println!();
    }

    let mut verified = 0usize;
    let mut failed = 0usize;
    for id in &ids {
        match verify_commit(&repo, id) {
            Ok(()) => {
                if args.verbose {
                    println!("{} {}", label(id), "OK".green());
                }
                verified += 1;
            }
            Err(reason) => {
                if args.verbose {
                    println!("{} {}", label(id), format!("FAILED ({reason})").red());
                }
                failed += 1;
            }
        }
    }

    println!();
    if failed == 0 {
        println!("{}", "Verification successful!".green());
        println!("  {verified} commit(s) verified");
        println!("  All parent links valid");
        println!("  All commit hashes match");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{}", "Verification failed!".red());
        println!("  {verified} commit(s) verified");
        println!("  {failed} commit(s) failed");
        Ok(ExitCode::FAILURE)
    }
}

fn label(id: &Digest) -> String {
    format!("Verifying commit {}...", id.short_hex())
}

/// One commit's checks: it loads, its id recomputes, and its parent exists.
fn verify_commit(repo: &Repository, id: &Digest) -> Result<(), &'static str> {
    let env = match repo.load_commit(id) {
        Ok(Some(env)) => env,
        Ok(None) => return Err("not found"),
        Err(_) => return Err("unreadable"),
    };

    if env.verify().is_err() {
        return Err("hash mismatch");
    }

    if !env.parent_id.is_zero() {
        match repo.commit_exists(&env.parent_id) {
            Ok(true) => {}
            Ok(false) => return Err("missing parent"),
            Err(_) => return Err("unreadable"),
        }
    }

    Ok(())
}
