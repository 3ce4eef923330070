use std::process::ExitCode;

use crate::cli::Command;
use crate::error::CliError;

mod commit;
mod init;
mod log;
mod status;
mod verify;
mod watch;

pub fn run(command: Command) -> Result<ExitCode, CliError> {
    match command {
        Command::Init(args) => init::run(args),
        Command::Commit(args) => commit::run(args),
        Command::Log(args) => log::run(args),
        Command::Status(args) => status::run(args),
        Command::Verify(args) => verify::run(args),
        Command::Watch(args) => watch::run(args),
    }
}
