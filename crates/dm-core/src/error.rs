//! Error types for dm-core

use thiserror::Error;

/// Core error type for duckmig
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E004: A configured migration file does not exist
    #[error("[E004] Migration file not found for step '{step}' in set '{set}': {path}")]
    MigrationFileNotFound {
        set: String,
        step: String,
        path: String,
    },

    /// E005: Invalid table schema description
    #[error("[E005] Invalid table schema: {message}")]
    InvalidSchema { message: String },

    /// E006: Invalid set or step name
    #[error("[E006] Invalid {kind} '{name}': {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: &'static str,
    },

    /// E007: IO error with file path context
    #[error("[E007] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl From<serde_yaml::Error> for CoreError {
    fn from(err: serde_yaml::Error) -> Self {
        CoreError::ConfigParseError {
            message: err.to_string(),
        }
    }
}
