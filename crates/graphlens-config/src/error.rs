use std::path::PathBuf;

/// Errors raised while loading or applying configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// File that failed to load
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The configuration content is not valid for its format
    #[error("failed to parse {format} config: {message}")]
    Parse {
        /// Format name (toml, yaml, json)
        format: &'static str,
        /// Parser message
        message: String,
    },

    /// A `{env:VAR}` reference names an unset variable
    #[error("environment variable not found: {var_name}")]
    EnvVarNotFound {
        /// Name of the missing variable
        var_name: String,
    },

    /// The file extension does not map to a supported format
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// A value passed parsing but is not usable
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The logging subscriber could not be installed
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
