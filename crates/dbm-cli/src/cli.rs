//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use dbm_migrate::GuardStrategy;

/// dbm - apply versioned SQL scripts to a database schema exactly once
#[derive(Parser, Debug)]
#[command(name = "dbm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory (where dbmigrate.yml lives)
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Database file path, or :memory:
    #[arg(short, long, global = true, env = "DBM_DATABASE")]
    pub database: Option<String>,

    /// Schema (tenant) name whose version is tracked
    #[arg(short, long, global = true, env = "DBM_SCHEMA")]
    pub schema: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending migrations
    Migrate(MigrateArgs),

    /// Show the stored version and pending migrations
    Status(StatusArgs),

    /// Remove a migration lock left behind by a crashed run
    Unlock,
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Directory containing numbered SQL scripts
    #[arg(long, env = "DBM_SCRIPTS_DIR")]
    pub scripts_dir: Option<String>,

    /// Concurrency guard strategy
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Apply migrations that share a version instead of failing
    #[arg(long)]
    pub allow_duplicates: bool,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Directory containing numbered SQL scripts
    #[arg(long, env = "DBM_SCRIPTS_DIR")]
    pub scripts_dir: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: StatusOutput,
}

/// Concurrency guard strategies
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    /// One enclosing transaction; a failure undoes the whole run
    Transactional,
    /// Fail fast if another run holds the schema; each migration commits on its own
    ExplicitLock,
}

impl From<StrategyArg> for GuardStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Transactional => GuardStrategy::Transactional,
            StrategyArg::ExplicitLock => GuardStrategy::ExplicitLock,
        }
    }
}

/// Status output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutput {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
