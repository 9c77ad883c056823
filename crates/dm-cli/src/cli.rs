//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// duckmig - ordered, tracked schema migrations for DuckDB
#[derive(Parser, Debug)]
#[command(name = "duckmig")]
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

    /// Path to the config file
    #[arg(short, long, global = true, default_value = "duckmig.yml")]
    pub config: String,

    /// Override the database path from the config
    #[arg(short, long, global = true, env = "DUCKMIG_DATABASE")]
    pub database: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending migrations
    Apply(ApplyArgs),

    /// Show applied and pending migrations
    List(ListArgs),

    /// List tables in the database
    Tables,
}

/// Arguments for the apply command
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Only apply this migration set
    #[arg(short, long)]
    pub set: Option<String>,

    /// Stop before this migration, leaving it and later ones pending
    #[arg(long)]
    pub stop_before: Option<String>,
}

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only list this migration set
    #[arg(short, long)]
    pub set: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: ListOutput,
}

/// List output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOutput {
    /// Table format
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
