//! Error types for configuration loading and request validation.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading `cutover.toml` or validating input.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid duration '{0}' (expected e.g. \"10s\", \"500ms\", \"2m\")")]
    Duration(String),

    #[error("invalid version identifier '{0}'")]
    Version(String),
}
