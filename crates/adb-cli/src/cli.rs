//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};

/// assembl-db-manage - cooperative schema bootstrap and migration
#[derive(Parser, Debug)]
#[command(name = "assembl-db-manage")]
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
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: assembl-db.yml in the current directory)
    #[arg(short, long, global = true, env = "ADB_CONFIG")]
    pub config: Option<String>,

    /// Override database.url from the config
    #[arg(long, global = true, env = "ADB_DATABASE_URL")]
    pub database_url: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the schema if empty, migrate it if behind
    Bootstrap(BootstrapArgs),

    /// Migrate an existing schema
    Upgrade(UpgradeArgs),

    /// Check the database revision against the migration head
    Check,

    /// Print the revision recorded in the database
    Current,

    /// Print the heads of the migration history
    Heads,

    /// List revisions in apply order
    History(HistoryArgs),

    /// Populate seed vocabularies
    Seed,

    /// Record a revision without running migrations
    Stamp(StampArgs),
}

/// Arguments for the bootstrap command
#[derive(Args, Debug)]
pub struct BootstrapArgs {
    /// Do not migrate an existing schema that is behind head
    #[arg(long)]
    pub no_migrate: bool,

    /// Do not populate seed vocabularies on a fresh schema
    #[arg(long)]
    pub no_seed: bool,
}

/// Arguments for the upgrade command
#[derive(Args, Debug)]
pub struct UpgradeArgs {
    /// Target revision (default: head)
    #[arg(long)]
    pub to: Option<String>,
}

/// Arguments for the history command
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the stamp command
#[derive(Args, Debug)]
pub struct StampArgs {
    /// Revision to record
    pub revision: String,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
