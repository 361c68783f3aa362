//! Configuration management.
//!
//! # Configuration File Format
//!
//! ```toml
//! [catalog]
//! host = "library.example.ac.uk"
//! port = 210
//! database = "MAIN*BIB"
//! control_number_key = "12"
//! dump_path = "records.txt"
//!
//! [availability]
//! url = "http://aleph.example.ac.uk/X"
//! library = "BIB01"
//! timeout_seconds = 2
//!
//! [cache]
//! enabled = true
//! ttl_seconds = 120
//!
//! [places]
//! identifier_prefix = "olis-aleph"
//! directory = "places.json"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! Every key can be overridden from the environment, e.g.
//! `CATALOG_SEARCH_AVAILABILITY__URL` or `CATALOG_SEARCH_CACHE__TTL_SECONDS`.

mod file_config;

pub use file_config::{find_config_file, load_config, ConfigError, CONFIG_FILE_NAME, ENV_PREFIX};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::{StopWords, DEFAULT_PAGE_SIZE, DEFAULT_STOP_WORDS};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub availability: AvailabilityConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub places: PlacesConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

/// Catalogue endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_database")]
    pub database: String,

    /// Record syntax requested from the target
    #[serde(default = "default_syntax")]
    pub syntax: String,

    #[serde(default = "default_charset")]
    pub charset: String,

    /// Bib-1 use attribute for control number lookups
    #[serde(default = "default_control_number_key")]
    pub control_number_key: String,

    /// Serve queries from a dump of raw records instead of the live target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dump_path: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: default_database(),
            syntax: default_syntax(),
            charset: default_charset(),
            control_number_key: default_control_number_key(),
            dump_path: None,
        }
    }
}

impl CatalogConfig {
    /// `host:port/database`
    pub fn target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    210
}

fn default_database() -> String {
    "Default".to_string()
}

fn default_syntax() -> String {
    "USMARC".to_string()
}

fn default_charset() -> String {
    "UTF-8".to_string()
}

fn default_control_number_key() -> String {
    "12".to_string()
}

/// Circulation-status feed settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of the feed; annotation is off when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_library")]
    pub library: String,

    #[serde(default = "default_availability_timeout")]
    pub timeout_seconds: u64,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: None,
            library: default_library(),
            timeout_seconds: default_availability_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_library() -> String {
    "BIB01".to_string()
}

fn default_availability_timeout() -> u64 {
    2
}

/// Result-set cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,

    /// Directory of the file cache; entries stay in memory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_cache_ttl(),
            directory: None,
        }
    }
}

fn default_cache_ttl() -> u64 {
    120
}

/// Default directory for the file cache
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("catalog-search")
}

/// Point-of-interest settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacesConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_identifier_prefix")]
    pub identifier_prefix: String,

    /// JSON file of places keyed by identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            identifier_prefix: default_identifier_prefix(),
            directory: None,
        }
    }
}

fn default_identifier_prefix() -> String {
    "olis-aleph".to_string()
}

/// Query building settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_stop_words")]
    pub stop_words: Vec<String>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stop_words: default_stop_words(),
        }
    }
}

impl QueryConfig {
    pub fn stop_words(&self) -> StopWords {
        self.stop_words.iter().cloned().collect()
    }
}

fn default_stop_words() -> Vec<String> {
    DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect()
}

/// Representation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Path prefix of generated links
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_count")]
    pub default_count: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            default_count: default_count(),
        }
    }
}

fn default_base_url() -> String {
    "/library".to_string()
}

fn default_count() -> usize {
    DEFAULT_PAGE_SIZE
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `json` for structured output, plain text otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.catalog.port, 210);
        assert_eq!(config.catalog.control_number_key, "12");
        assert_eq!(config.availability.library, "BIB01");
        assert_eq!(config.availability.timeout_seconds, 2);
        assert!(config.availability.url.is_none());
        assert_eq!(config.cache.ttl_seconds, 120);
        assert_eq!(config.places.identifier_prefix, "olis-aleph");
        assert_eq!(config.api.default_count, 35);
        assert!(config.query.stop_words().contains("the"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = Config::default();
        config.availability.url = Some("http://aleph.example/X".to_string());
        let text = config.to_toml().unwrap();
        assert!(text.contains("[availability]"));

        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_sections_use_defaults() {
        let config: Config = toml::from_str("[catalog]\nhost = \"z3950.example\"\n").unwrap();
        assert_eq!(config.catalog.host, "z3950.example");
        assert_eq!(config.catalog.port, 210);
        assert_eq!(config.catalog.target(), "z3950.example:210/Default");
        assert_eq!(config.cache, CacheConfig::default());
    }
}
