//! Configuration error types.

use thiserror::Error;

/// Errors produced while locating, parsing, or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file existed but could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// The file that failed to read.
        path: std::path::PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A config file existed but did not parse as TOML.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// The file that failed to parse.
        path: std::path::PathBuf,
        /// Underlying TOML error.
        #[source]
        source: Box<toml::de::Error>,
    },

    /// An environment variable held a value that could not be converted to
    /// its target type (e.g. a non-numeric `COLLABHUB_SESSION_IDLE_TIMEOUT_SECS`).
    #[error("invalid value for environment variable {var}: {value}")]
    InvalidEnvValue {
        /// The variable name.
        var: String,
        /// The value that failed to parse.
        value: String,
    },

    /// The fully-merged configuration failed a validation rule.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
