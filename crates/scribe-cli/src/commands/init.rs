use std::path::Path;
use std::process::ExitCode;

use scribe_repo::Repository;

use crate::cli::InitArgs;
use crate::error::CliError;

pub fn run(args: InitArgs) -> Result<ExitCode, CliError> {
    let path = args.path.as_deref().map(Path::new);
    let repo = Repository::init(path)?;

    if args.author.is_some() || args.role.is_some() {
        let mut config = repo.load_config()?;
        if let Some(author) = args.author {
            config.author_id = Some(author);
        }
        if let Some(role) = args.role {
            config.author_role = Some(role);
        }
        repo.save_config(&config)?;
    }

    println!(
        "Initialized empty Scribe repository in {}",
        repo.root().display()
    );
    Ok(ExitCode::SUCCESS)
}
