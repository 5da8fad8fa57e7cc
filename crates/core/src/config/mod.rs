//! Configuration management for the geoparse pipeline
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Recognition/resolution run behaviour
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

/// Whether a resolver abstention marks the reference as processed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMarking {
    /// Mark only references that received a referent; abstentions are retried
    #[default]
    OnResult,
    /// Mark every submitted reference, including abstentions
    Always,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineSettings {
    /// Upper bound on a single predict/fit call (unset = no timeout)
    pub capability_timeout_secs: Option<u64>,

    /// Marking policy for resolver abstentions
    #[serde(default)]
    pub resolution_marking: ResolutionMarking,

    /// Number of documents/references persisted concurrently
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,
}

// Default value functions
fn default_database_url() -> String { "sqlite::memory:".to_string() }
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_max_concurrency() -> usize { 4 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("database.url", default_database_url())?
            .set_default("pipeline.resolution_marking", "on_result")?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__DATABASE__URL=postgres://localhost/geoparse
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }
}

impl DatabaseConfig {
    /// Whether the URL points at a private in-memory SQLite database
    pub fn is_sqlite_memory(&self) -> bool {
        self.url.starts_with("sqlite:") && self.url.contains(":memory:")
    }
}

impl PipelineSettings {
    /// Get the capability timeout as Duration
    pub fn capability_timeout(&self) -> Option<Duration> {
        self.capability_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            read_url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            capability_timeout_secs: None,
            resolution_marking: ResolutionMarking::default(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.url, "sqlite::memory:");
        assert!(config.database.is_sqlite_memory());
        assert_eq!(config.pipeline.resolution_marking, ResolutionMarking::OnResult);
        assert!(config.pipeline.capability_timeout().is_none());
    }

    #[test]
    fn test_from_file_overrides_pipeline() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "[database]\nurl = \"postgres://localhost/geoparse\"\n\n\
             [pipeline]\ncapability_timeout_secs = 30\nresolution_marking = \"always\""
        )
        .unwrap();

        let config = AppConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.database.url, "postgres://localhost/geoparse");
        assert!(!config.database.is_sqlite_memory());
        assert_eq!(config.pipeline.resolution_marking, ResolutionMarking::Always);
        assert_eq!(
            config.pipeline.capability_timeout(),
            Some(Duration::from_secs(30))
        );
        assert_eq!(config.pipeline.max_concurrency, 4);
        assert!(config.observability.json_logging);
    }
}
