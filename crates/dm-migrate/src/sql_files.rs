//! Migration sets backed by SQL files.
//!
//! A configured set lists its steps by name; each step is the file
//! `<dir>/<step>.sql`, run as a batch inside the step's transaction.
//! Files are read and syntax-checked when the set is loaded, so a typo
//! fails before anything touches the database.

use crate::error::{MigrateError, MigrateResult};
use crate::migration::MigrationSet;
use dm_core::{Config, CoreError, SetConfig};
use sqlparser::dialect::DuckDbDialect;
use sqlparser::parser::Parser;
use std::path::Path;

/// Load every set in `config`, in configuration order.
pub fn load_sql_sets(config: &Config) -> MigrateResult<Vec<MigrationSet>> {
    config
        .sets
        .iter()
        .map(|set| load_sql_set(set, &config.set_dir(set)))
        .collect()
}

/// Build a [`MigrationSet`] from the SQL files of `set`, found in `dir`.
pub fn load_sql_set(set: &SetConfig, dir: &Path) -> MigrateResult<MigrationSet> {
    let mut builder = MigrationSet::builder(set.name.as_str())?;

    for step in &set.steps {
        let path = set.step_file(dir, step);
        let sql = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MigrateError::from(CoreError::MigrationFileNotFound {
                    set: set.name.to_string(),
                    step: step.to_string(),
                    path: path.display().to_string(),
                })
            } else {
                MigrateError::Io {
                    path: path.display().to_string(),
                    source: e,
                }
            }
        })?;

        let statements = validate_sql(&sql, &path)?;
        log::debug!(
            "Loaded {}/{} from {} ({statements} statement(s))",
            set.name,
            step,
            path.display()
        );

        builder = builder.add(step.as_str(), move |db| db.execute_batch(&sql))?;
    }

    Ok(builder.build())
}

/// Check that `sql` parses as DuckDB SQL and holds at least one statement.
///
/// Returns the number of statements.
pub fn validate_sql(sql: &str, path: &Path) -> MigrateResult<usize> {
    let invalid = |message: String| MigrateError::InvalidSql {
        path: path.display().to_string(),
        message,
    };

    let statements = Parser::parse_sql(&DuckDbDialect {}, sql).map_err(|e| {
        let msg = e.to_string();
        invalid(msg.trim_start_matches("sql parser error: ").to_string())
    })?;

    if statements.is_empty() {
        return Err(invalid("file contains no statements".to_string()));
    }
    Ok(statements.len())
}

#[cfg(test)]
#[path = "sql_files_test.rs"]
mod tests;
