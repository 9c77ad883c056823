//! Shared utilities for CLI commands

use anyhow::{bail, Context, Result};
use dm_core::{Config, SetConfig};
use dm_db::DuckDbBackend;
use dm_migrate::{load_sql_set, MigrationSet, TrackingStore};
use std::fmt;
use std::path::Path;

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that destructors run and the database is closed cleanly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the failure was already reported.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Load the config file named in the global arguments.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    Config::load(Path::new(&global.config))
        .with_context(|| format!("Failed to load config {}", global.config))
}

/// Database location: `--database` wins over the config file.
///
/// A `--database` path is used as given; the config's path resolves
/// relative to the config file.
pub(crate) fn database_path(config: &Config, global: &GlobalArgs) -> String {
    match &global.database {
        Some(path) => path.clone(),
        None => config.database_path(),
    }
}

/// Open the database a command works against.
pub(crate) fn open_database(path: &str, global: &GlobalArgs) -> Result<DuckDbBackend> {
    if global.verbose {
        eprintln!("[verbose] Opening database: {path}");
    }
    log::debug!("Opening database {path}");
    DuckDbBackend::new(path).with_context(|| format!("Failed to open database {path}"))
}

/// Tracking store configured for the project.
pub(crate) fn tracking_store(config: &Config) -> TrackingStore {
    TrackingStore::new(config.tracking_table.as_str())
}

/// The configured sets a command should touch, in config order.
pub(crate) fn selected_sets<'a>(
    config: &'a Config,
    only: Option<&str>,
) -> Result<Vec<&'a SetConfig>> {
    match only {
        None => Ok(config.sets.iter().collect()),
        Some(name) => match config.get_set(name) {
            Some(set) => Ok(vec![set]),
            None => {
                let known: Vec<&str> = config.sets.iter().map(|s| s.name.as_str()).collect();
                bail!(
                    "Unknown migration set '{name}' (configured: {})",
                    known.join(", ")
                )
            }
        },
    }
}

/// Load the SQL migrations of every selected set.
///
/// All files are read and checked before any set runs.
pub(crate) fn load_sets(config: &Config, sets: &[&SetConfig]) -> Result<Vec<MigrationSet>> {
    sets.iter()
        .map(|set| {
            load_sql_set(set, &config.set_dir(set))
                .with_context(|| format!("Failed to load migration set '{}'", set.name))
        })
        .collect()
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
