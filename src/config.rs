//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration management for the file search engine, supporting
//! TOML files and environment variable overrides with validation and type-safe
//! access to all system settings.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files (TOML), environment variables
//! - **Output**: Validated configuration structs with defaults and overrides
//! - **Validation**: Type checking, range validation
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables (highest priority)
//! 2. Configuration files
//! 3. Default values (lowest priority)
//!
//! ## Usage
//! ```rust,no_run
//! use file_search_engine::config::Config;
//!
//! let config = Config::from_file("config.toml").unwrap();
//! println!("Server port: {}", config.server.port);
//! ```

use crate::errors::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure containing all system settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server and API configuration
    pub server: ServerConfig,
    /// Document and content storage settings
    pub storage: StorageConfig,
    /// Indexing pipeline settings
    pub indexing: IndexingConfig,
    /// Search and ranking behavior
    pub search: SearchConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server and API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Number of HTTP worker threads
    pub workers: usize,
    /// Maximum upload payload size in MB
    pub max_payload_size_mb: usize,
    /// Enable CORS
    pub enable_cors: bool,
}

/// Backend used for document metadata persistence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStoreKind {
    /// Embedded sled database
    Sled,
    /// Volatile in-process map
    Memory,
}

/// Document and content storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Metadata store backend
    pub db_type: DocumentStoreKind,
    /// Database file path (sled backend)
    pub db_path: PathBuf,
    /// Directory where raw document content is stored
    pub content_dir: PathBuf,
    /// Compress stored content with gzip
    pub enable_compression: bool,
}

/// Indexing pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Grace period for draining in-flight work on shutdown, in seconds
    pub shutdown_grace_seconds: u64,
}

/// Search and ranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default maximum number of results
    pub default_max_results: usize,
    /// Maximum query length in characters
    pub max_query_length: usize,
    /// Characters of context on each side of a snippet match
    pub snippet_context_chars: usize,
    /// Score multiplier applied once when consecutive query terms are adjacent
    pub phrase_boost: f64,
    /// Score multiplier applied when a query term appears in the file name
    pub filename_boost: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable structured JSON logging
    pub json_format: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: num_cpus::get(),
            max_payload_size_mb: 10,
            enable_cors: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_type: DocumentStoreKind::Sled,
            db_path: PathBuf::from("./data/documents.db"),
            content_dir: PathBuf::from("./storage"),
            enable_compression: false,
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_seconds: 5,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_max_results: 10,
            max_query_length: 1000,
            snippet_context_chars: 200,
            phrase_boost: 1.5,
            filename_boost: 1.3,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            indexing: IndexingConfig::default(),
            search: SearchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!("Configuration file not found: {:?}, using defaults", path);
            let mut config = Self::default();
            config.apply_env_overrides()?;
            config.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|e| SearchError::Config {
            message: format!("Failed to read config file {:?}: {}", path, e),
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| SearchError::Config {
            message: format!("Failed to parse config file {:?}: {}", path, e),
        })?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("FILE_SEARCH_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("FILE_SEARCH_PORT") {
            self.server.port = port.parse().map_err(|_| SearchError::Config {
                message: "Invalid port number in FILE_SEARCH_PORT".to_string(),
            })?;
        }
        if let Ok(db_path) = std::env::var("FILE_SEARCH_DB_PATH") {
            self.storage.db_path = PathBuf::from(db_path);
        }
        if let Ok(content_dir) = std::env::var("FILE_SEARCH_CONTENT_DIR") {
            self.storage.content_dir = PathBuf::from(content_dir);
        }

        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(SearchError::Validation {
                field: "server.port".to_string(),
                reason: "Port cannot be zero".to_string(),
            });
        }

        if self.server.workers == 0 {
            return Err(SearchError::Validation {
                field: "server.workers".to_string(),
                reason: "Worker count must be greater than zero".to_string(),
            });
        }

        if self.search.default_max_results == 0 {
            return Err(SearchError::Validation {
                field: "search.default_max_results".to_string(),
                reason: "Result limit must be greater than zero".to_string(),
            });
        }

        if self.search.phrase_boost < 1.0 || self.search.filename_boost < 1.0 {
            return Err(SearchError::Validation {
                field: "search".to_string(),
                reason: "Boost factors must be >= 1.0".to_string(),
            });
        }

        if self.indexing.shutdown_grace_seconds == 0 {
            return Err(SearchError::Validation {
                field: "indexing.shutdown_grace_seconds".to_string(),
                reason: "Shutdown grace period must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Get configuration as TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SearchError::Config {
            message: format!("Failed to serialize config to TOML: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.default_max_results, 10);
        assert_eq!(config.search.snippet_context_chars, 200);
    }

    #[test]
    fn rejects_sub_unit_boosts() {
        let mut config = Config::default();
        config.search.phrase_boost = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config::default();
        let serialized = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.storage.db_type, DocumentStoreKind::Sled);
    }
}
