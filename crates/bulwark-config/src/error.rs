//! Configuration error types.

use bulwark_core::PolicyError;
use thiserror::Error;

/// Errors raised while loading or validating a policy file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadError {
        /// File path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the schema.
    #[error("failed to parse {path}: {source}")]
    ParseError {
        /// File path, or a placeholder for in-memory sources.
        path: String,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// A field holds an unacceptable value.
    #[error("invalid value for {field}: {message}")]
    ValidationError {
        /// Dotted field path.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Building the runtime policy failed.
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
