//! Error types for the migration engine.

use dm_core::{CoreError, MigrationName, SetName};
use dm_db::DbError;
use thiserror::Error;

/// Migration engine errors.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// The same step name was registered twice in one set (M001).
    #[error("[M001] Duplicate migration name '{name}' in set '{set}'")]
    DuplicateMigrationName { set: SetName, name: MigrationName },

    /// A step's action failed; nothing was recorded for it (M002).
    #[error("[M002] Migration '{name}' in set '{set}' failed: {source}")]
    StepFailed {
        set: SetName,
        name: MigrationName,
        #[source]
        source: DbError,
    },

    /// Rebuilding the tracking table failed and was rolled back (M003).
    #[error("[M003] Tracking table upgrade failed for {table}: {message}")]
    TrackingUpgradeFailure { table: String, message: String },

    /// A (set, name) pair was recorded twice (M004).
    ///
    /// `apply` skips applied steps before recording, so this signals a
    /// broken invariant rather than a user error.
    #[error("[M004] Migration '{name}' in set '{set}' is already recorded as applied")]
    DuplicateRecord { set: SetName, name: MigrationName },

    /// A set or step name failed validation (M005).
    #[error("[M005] {0}")]
    InvalidName(String),

    /// A SQL migration file could not be parsed (M006).
    #[error("[M006] Invalid SQL in {path}: {message}")]
    InvalidSql { path: String, message: String },

    /// A SQL migration file could not be read (M007).
    #[error("[M007] Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Database capability error outside a step action (M008).
    #[error("[M008] {0}")]
    Database(#[from] DbError),

    /// Configuration error (M009).
    #[error("[M009] {0}")]
    Core(CoreError),
}

/// Result type alias for [`MigrateError`].
pub type MigrateResult<T> = Result<T, MigrateError>;

impl From<CoreError> for MigrateError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidName { .. } => MigrateError::InvalidName(err.to_string()),
            other => MigrateError::Core(other),
        }
    }
}
