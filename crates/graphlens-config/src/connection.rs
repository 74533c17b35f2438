//! Connection configuration with sensible defaults

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Query language spoken by a connection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum QueryEngine {
    /// Apache TinkerPop Gremlin (GraphSON responses)
    #[default]
    Gremlin,
    /// openCypher (Neptune-style `~id` / `~labels` JSON)
    OpenCypher,
    /// SPARQL 1.1 (JSON results)
    Sparql,
}

impl QueryEngine {
    /// Get the engine name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gremlin => "gremlin",
            Self::OpenCypher => "opencypher",
            Self::Sparql => "sparql",
        }
    }
}

impl fmt::Display for QueryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How vertex identifiers are rendered in Gremlin queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    /// Ids are quoted string literals
    #[default]
    String,
    /// Ids that parse as integers are rendered as long literals
    Number,
}

/// Top-level configuration for one connection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConnectionConfig {
    /// Query language of the backend
    #[serde(default)]
    pub query_engine: QueryEngine,
    /// Identifier domain (Gremlin only)
    #[serde(default)]
    pub id_type: IdType,
    /// Request cache settings
    #[serde(default)]
    pub cache: RequestCacheConfig,
    /// Batch runner settings
    #[serde(default)]
    pub batch: BatchConfig,
    /// Blank-node registry retention (SPARQL only)
    #[serde(default)]
    pub blank_nodes: BlankNodeConfig,
    /// Schema discovery settings
    #[serde(default)]
    pub schema: SchemaDiscoveryConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ConnectionConfig {
    /// Default configuration for the given engine
    pub fn for_engine(query_engine: QueryEngine) -> Self {
        Self {
            query_engine,
            ..Self::default()
        }
    }

    /// Reject values that parse but cannot work
    pub fn validate(&self) -> ConfigResult<()> {
        if self.batch.window_size == 0 {
            return Err(ConfigError::Invalid(
                "batch.window_size must be at least 1".to_string(),
            ));
        }
        if self.blank_nodes.max_entries == Some(0) {
            return Err(ConfigError::Invalid(
                "blank_nodes.max_entries must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Request cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestCacheConfig {
    /// Disabled caches pass every request through to the transport
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Lifetime of a cached response
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
}

impl RequestCacheConfig {
    /// Lifetime as a [`Duration`]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for RequestCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_cache_ttl(),
        }
    }
}

/// Batch runner configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchConfig {
    /// Maximum number of batch queries in flight at once
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
        }
    }
}

/// Blank-node retention policy
///
/// With both fields unset, blank nodes live as long as the connector.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlankNodeConfig {
    /// Evict the oldest entries past this many
    #[serde(default)]
    pub max_entries: Option<usize>,
    /// Evict entries first seen longer ago than this
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

impl BlankNodeConfig {
    /// TTL as a [`Duration`], when set
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_seconds.map(Duration::from_secs)
    }
}

/// Schema discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaDiscoveryConfig {
    /// Instances sampled per type when discovering attributes
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,
    /// Also discover (source type, edge type, target type) patterns
    #[serde(default = "default_true")]
    pub discover_edge_connections: bool,
}

impl Default for SchemaDiscoveryConfig {
    fn default() -> Self {
        Self {
            sample_limit: default_sample_limit(),
            discover_edge_connections: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default filter directive (`RUST_LOG` wins when set)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact single-line text
    #[default]
    Text,
    /// Multi-line human readable output
    Pretty,
    /// One JSON object per event
    Json,
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    600
}

fn default_window_size() -> usize {
    10
}

fn default_sample_limit() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}
