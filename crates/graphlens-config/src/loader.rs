//! Configuration file loading
//!
//! Connection files may be TOML, YAML or JSON. Any string value of the form
//! `{env:VAR}` is replaced by the value of that environment variable before
//! deserialisation, which keeps credentials-adjacent settings out of files:
//!
//! ```toml
//! query_engine = "sparql"
//!
//! [logging]
//! level = "{env:GRAPHLENS_LOG}"
//! ```

use crate::connection::ConnectionConfig;
use crate::error::{ConfigError, ConfigResult};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

/// Supported configuration formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML
    #[cfg(feature = "toml")]
    Toml,
    /// YAML
    #[cfg(feature = "yaml")]
    Yaml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            #[cfg(feature = "toml")]
            "toml" => Ok(Self::Toml),
            #[cfg(feature = "yaml")]
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "toml")]
            Self::Toml => "toml",
            #[cfg(feature = "yaml")]
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }
}

/// Loads [`ConnectionConfig`] from files or strings
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a configuration file
    pub async fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<ConnectionConfig> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        debug!("Loading {} config from {}", format.name(), path.display());

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        Self::load_from_str(&content, format)
    }

    /// Parse, resolve `{env:VAR}` references and validate
    pub fn load_from_str(content: &str, format: ConfigFormat) -> ConfigResult<ConnectionConfig> {
        let mut value = parse_value(content, format)?;
        resolve_env_references(&mut value)?;

        let config: ConnectionConfig =
            serde_json::from_value(value).map_err(|e| ConfigError::Parse {
                format: format.name(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }
}

fn parse_value(content: &str, format: ConfigFormat) -> ConfigResult<Value> {
    let parsed = match format {
        #[cfg(feature = "toml")]
        ConfigFormat::Toml => toml::from_str::<Value>(content).map_err(|e| e.to_string()),
        #[cfg(feature = "yaml")]
        ConfigFormat::Yaml => serde_yaml::from_str::<Value>(content).map_err(|e| e.to_string()),
        ConfigFormat::Json => serde_json::from_str::<Value>(content).map_err(|e| e.to_string()),
    };

    parsed.map_err(|message| ConfigError::Parse {
        format: format.name(),
        message,
    })
}

/// Replace every `{env:VAR}` string in the value tree
pub fn resolve_env_references(value: &mut Value) -> ConfigResult<()> {
    match value {
        Value::String(s) => {
            if let Some(var_name) = extract_env_var(s) {
                debug!("Processing env reference: {}", var_name);
                match std::env::var(var_name) {
                    Ok(env_value) => *value = Value::String(env_value),
                    Err(_) => {
                        warn!("Environment variable not found: {}", var_name);
                        return Err(ConfigError::EnvVarNotFound {
                            var_name: var_name.to_string(),
                        });
                    }
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                resolve_env_references(item)?;
            }
        }
        Value::Object(map) => {
            for (_key, item) in map.iter_mut() {
                resolve_env_references(item)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn extract_env_var(s: &str) -> Option<&str> {
    let inner = s.trim().strip_prefix("{env:")?.strip_suffix('}')?;
    let inner = inner.trim();
    (!inner.is_empty()).then_some(inner)
}
