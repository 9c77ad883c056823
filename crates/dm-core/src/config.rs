//! Configuration types and parsing for duckmig.yml
//!
//! ```yaml
//! database: app.duckdb
//! tracking_table: _duckmig_migrations
//! sets:
//!   - name: core
//!     dir: migrations/core
//!     steps: [m001_dogs, m002_cats]
//! ```
//!
//! Steps run in the order they are listed, whatever their names.

use crate::error::{CoreError, CoreResult};
use crate::names::{MigrationName, SetName};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default config file name looked up by the CLI.
pub const CONFIG_FILE_NAME: &str = "duckmig.yml";

/// Default name of the tracking table.
pub const DEFAULT_TRACKING_TABLE: &str = "_duckmig_migrations";

/// Main project configuration from duckmig.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Database path, or `:memory:`
    #[serde(default = "default_db_path")]
    pub database: String,

    /// Table recording applied migrations
    #[serde(default = "default_tracking_table")]
    pub tracking_table: String,

    /// Migration sets, applied in this order
    pub sets: Vec<SetConfig>,

    /// Directory the config was loaded from; relative paths resolve here
    #[serde(skip)]
    base_dir: PathBuf,
}

/// One migration set backed by a directory of SQL files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetConfig {
    /// Set name recorded in the tracking table
    pub name: SetName,

    /// Directory holding `<step>.sql` files
    pub dir: String,

    /// Step names in registration order
    pub steps: Vec<MigrationName>,
}

impl SetConfig {
    /// Path of the SQL file for `step`, relative to the set directory.
    pub fn step_file(&self, dir: &Path, step: &MigrationName) -> PathBuf {
        dir.join(format!("{step}.sql"))
    }
}

fn default_db_path() -> String {
    ":memory:".to_string()
}

fn default_tracking_table() -> String {
    DEFAULT_TRACKING_TABLE.to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut config = Self::parse(&content)?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        log::debug!(
            "Loaded config {} with {} migration set(s)",
            path.display(),
            config.sets.len()
        );
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str) -> CoreResult<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.database.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "database path cannot be empty".to_string(),
            });
        }

        if self.tracking_table.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "tracking_table cannot be empty".to_string(),
            });
        }

        if self.sets.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "at least one migration set must be configured".to_string(),
            });
        }

        let mut set_names = HashSet::new();
        for set in &self.sets {
            if !set_names.insert(set.name.as_str()) {
                return Err(CoreError::ConfigInvalid {
                    message: format!("duplicate migration set '{}'", set.name),
                });
            }

            let mut step_names = HashSet::new();
            for step in &set.steps {
                if !step_names.insert(step.as_str()) {
                    return Err(CoreError::ConfigInvalid {
                        message: format!("duplicate step '{}' in set '{}'", step, set.name),
                    });
                }
            }
        }

        Ok(())
    }

    /// Look up a set by name
    pub fn get_set(&self, name: &str) -> Option<&SetConfig> {
        self.sets.iter().find(|s| s.name == name)
    }

    /// Absolute (or config-relative) directory of a set's SQL files
    pub fn set_dir(&self, set: &SetConfig) -> PathBuf {
        let dir = Path::new(&set.dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.base_dir.join(dir)
        }
    }

    /// Database path resolved against the config directory.
    ///
    /// `:memory:` is passed through untouched.
    pub fn database_path(&self) -> String {
        resolve_database(&self.database, &self.base_dir)
    }

    /// Directory the config was loaded from
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

/// Resolve a database location relative to `base_dir`.
pub fn resolve_database(database: &str, base_dir: &Path) -> String {
    if database == ":memory:" || Path::new(database).is_absolute() {
        database.to_string()
    } else {
        base_dir.join(database).display().to_string()
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
