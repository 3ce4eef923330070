use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "scribe",
    about = "Scribe — verifiable data lineage",
    long_about = "Scribe brings Git-like version control to your data pipelines. \
                  It tracks who changed a record, what process they used, and \
                  where that data came from.",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Produce verbose output
    ///
    /// Parsed before the command name; `verify` takes its own `-v` for
    /// per-commit output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Run as if scribe was started in PATH
    #[arg(short = 'C', value_name = "PATH", global = true)]
    pub path: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty Scribe repository
    Init(InitArgs),
    /// Record changes to the repository
    Commit(CommitArgs),
    /// Show commit logs
    Log(LogArgs),
    /// Show the repository status
    Status(StatusArgs),
    /// Verify repository integrity
    Verify(VerifyArgs),
    /// Monitor PostgreSQL for changes
    Watch(WatchArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Where to create the repository (default: current directory)
    pub path: Option<String>,
    /// Set default author ID
    #[arg(short, long, value_name = "ID")]
    pub author: Option<String>,
    /// Set default author role
    #[arg(short, long, value_name = "ROLE")]
    pub role: Option<String>,
}

#[derive(Args)]
pub struct CommitArgs {
    /// Commit message
    #[arg(short, long, value_name = "MSG")]
    pub message: Option<String>,
    /// Author ID (overrides config)
    #[arg(short, long, value_name = "ID")]
    pub author: Option<String>,
    /// Author role (overrides config)
    #[arg(short, long, value_name = "ROLE")]
    pub role: Option<String>,
    /// Process name
    #[arg(short, long, value_name = "NAME")]
    pub process: Option<String>,
    /// Process version
    #[arg(short = 'V', long, value_name = "VERSION")]
    pub version: Option<String>,
    /// Table name for the change
    #[arg(short, long, value_name = "TABLE")]
    pub table: Option<String>,
    /// Operation (INSERT/UPDATE/DELETE)
    #[arg(short, long, value_name = "OP")]
    pub operation: Option<String>,
    /// Change data (JSON)
    #[arg(short, long, value_name = "JSON")]
    pub data: Option<String>,
}

#[derive(Args)]
pub struct LogArgs {
    /// Start from this commit instead of HEAD
    pub commit: Option<String>,
    /// Show each commit on one line
    #[arg(long)]
    pub oneline: bool,
    /// Limit number of commits shown
    #[arg(short = 'n', long, default_value = "10", value_name = "NUM")]
    pub limit: usize,
    /// Filter by author ID (substring)
    #[arg(short, long, value_name = "ID")]
    pub author: Option<String>,
    /// Filter by process name (substring)
    #[arg(short, long, value_name = "NAME")]
    pub process: Option<String>,
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Machine-readable output
    #[arg(short, long)]
    pub porcelain: bool,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Verify starting from this commit instead of HEAD
    pub commit: Option<String>,
    /// Show detailed verification output (one line per commit)
    #[arg(short, long)]
    pub verbose: bool,
    /// Verify every commit in the store, not just those reachable from HEAD
    #[arg(short, long)]
    pub full: bool,
}

#[derive(Args)]
pub struct WatchArgs {
    /// PostgreSQL connection string
    #[arg(short, long, value_name = "CONN")]
    pub connection: Option<String>,
    /// Comma-separated list of tables to watch
    #[arg(short, long, value_name = "TABLES")]
    pub tables: Option<String>,
    /// CDC mode: trigger or logical
    #[arg(short, long, default_value = "logical", value_name = "MODE")]
    pub mode: String,
    /// Poll interval in milliseconds
    #[arg(short, long, default_value = "1000", value_name = "MS")]
    pub interval: u64,
    /// Replication slot name
    #[arg(short, long, default_value = "scribe_slot", value_name = "NAME")]
    pub slot: String,
    /// Setup CDC infrastructure and exit
    #[arg(short = 'S', long)]
    pub setup: bool,
    /// Cleanup CDC infrastructure and exit
    #[arg(long)]
    pub cleanup: bool,
}
