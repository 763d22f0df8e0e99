//! Configuration management for AnimeStream.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all settings.

use crate::models::Locale;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory settings
    pub data: DataConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Catalog API settings
    pub catalog: CatalogConfig,

    /// Video source and player settings
    pub streaming: StreamingConfig,

    /// Identity provider and profile store settings
    pub identity: IdentityConfig,

    /// User interface settings
    pub ui: UiConfig,
}

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Root data directory path
    pub root_dir: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log directory path (relative to data directory or absolute)
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// Catalog (Jikan) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Jikan API base URL
    pub base_url: String,

    /// Default number of entries for latest/popular/trending lists
    pub default_limit: u32,

    /// Default number of search results
    pub search_limit: u32,

    /// Response cache settings
    pub cache: CacheConfig,

    /// Maximum retries for failed requests
    pub max_retries: u32,

    /// Retry delay in milliseconds
    pub retry_delay_ms: u64,

    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Freshness window in seconds
    pub ttl_seconds: u64,

    /// Upper bound on cached entries (None = unbounded)
    pub max_entries: Option<usize>,
}

/// How video providers are queried
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResolveMode {
    /// One provider after another
    #[default]
    Sequential,
    /// All providers at once, results still in provider order
    Concurrent,
}

/// Streaming configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Base URL of the provider API (Consumet)
    pub provider_base_url: String,

    /// Cross-origin proxy prefix; the encoded provider URL is appended
    pub cors_proxy: Option<String>,

    /// Provider query mode
    pub resolve_mode: ResolveMode,

    /// External player program
    pub player_command: String,

    /// Extra arguments passed to the player before the stream URL
    pub player_args: Vec<String>,

    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,
}

/// Which document store backs user profiles
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Firestore,
    Sqlite,
    Memory,
}

/// Identity provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Web API key of the identity project
    pub api_key: String,

    /// Project id used by the document store
    pub project_id: String,

    /// Auth domain, used as the redirect URI for external sign-in
    pub auth_domain: String,

    /// Profile store backend
    pub store: StoreBackend,

    /// SQLite file for the local store (relative to data directory or absolute)
    pub sqlite_path: String,

    /// File where the CLI keeps the current session
    pub session_file: String,
}

/// User interface configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Language for generated titles and messages
    pub locale: Locale,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            provider_base_url: "https://api.consumet.org".to_string(),
            cors_proxy: Some("https://corsproxy.io/?url=".to_string()),
            resolve_mode: ResolveMode::Sequential,
            player_command: "mpv".to_string(),
            player_args: vec!["--really-quiet".to_string()],
            request_timeout_seconds: 20,
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            project_id: String::new(),
            auth_domain: String::new(),
            store: StoreBackend::Firestore,
            sqlite_path: "profiles.db".to_string(),
            session_file: "session.json".to_string(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root_dir: "data".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            default_level: "info".to_string(),
            console: true,
            file: false,
            json_format: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 300,
            max_entries: None,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.jikan.moe/v4".to_string(),
            default_limit: 12,
            search_limit: 20,
            cache: CacheConfig::default(),
            max_retries: 2,
            retry_delay_ms: 500,
            request_timeout_seconds: 30,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            logging: LoggingConfig::default(),
            catalog: CatalogConfig::default(),
            streaming: StreamingConfig::default(),
            identity: IdentityConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration saved successfully"
        );

        Ok(())
    }

    /// Get the path for the data directory
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.root_dir)
    }

    /// Get the path for the log directory
    pub fn log_dir(&self) -> PathBuf {
        self.resolve(&self.logging.log_dir)
    }

    /// Get the path for the local profile database
    pub fn sqlite_path(&self) -> PathBuf {
        self.resolve(&self.identity.sqlite_path)
    }

    /// Get the path for the persisted CLI session
    pub fn session_path(&self) -> PathBuf {
        self.resolve(&self.identity.session_file)
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir().join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data.root_dir, "data");
        assert_eq!(config.catalog.cache.ttl_seconds, 300);
        assert_eq!(config.catalog.cache.max_entries, None);
        assert_eq!(config.streaming.resolve_mode, ResolveMode::Sequential);
        assert_eq!(config.ui.locale, Locale::Arabic);
    }

    #[test]
    fn test_save_and_load_config() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");

        let mut original_config = Config::default();
        original_config.streaming.resolve_mode = ResolveMode::Concurrent;
        original_config.identity.store = StoreBackend::Sqlite;
        original_config.save(&config_path)?;

        assert!(config_path.exists());

        let loaded_config = Config::from_file(&config_path)?;
        assert_eq!(loaded_config.data.root_dir, original_config.data.root_dir);
        assert_eq!(
            loaded_config.catalog.base_url,
            original_config.catalog.base_url
        );
        assert_eq!(loaded_config.streaming.resolve_mode, ResolveMode::Concurrent);
        assert_eq!(loaded_config.identity.store, StoreBackend::Sqlite);

        Ok(())
    }

    #[test]
    fn test_optional_sections_default() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");

        let mut minimal = toml::to_string(&Config::default())?;
        minimal = minimal
            .split("[streaming]")
            .next()
            .unwrap_or_default()
            .to_string();
        std::fs::write(&config_path, minimal)?;

        let config = Config::from_file(&config_path)?;
        assert_eq!(config.streaming.player_command, "mpv");
        assert_eq!(config.identity.store, StoreBackend::Firestore);

        Ok(())
    }

    #[test]
    fn test_partial_sections_fill_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[streaming]
resolve_mode = "concurrent"

[identity]
api_key = "web-key"
project_id = "animestream-demo"
"#,
        )?;

        let config = Config::from_file(&config_path)?;
        assert_eq!(config.streaming.resolve_mode, ResolveMode::Concurrent);
        assert_eq!(config.streaming.provider_base_url, "https://api.consumet.org");
        assert_eq!(config.streaming.player_command, "mpv");
        assert_eq!(config.identity.api_key, "web-key");
        assert_eq!(config.identity.project_id, "animestream-demo");
        assert_eq!(config.identity.auth_domain, "");
        assert_eq!(config.identity.session_file, "session.json");
        assert_eq!(config.data.root_dir, "data");
        assert_eq!(config.catalog.cache.ttl_seconds, 300);

        Ok(())
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        // Should return default config without error
        assert_eq!(config.data.root_dir, "data");
    }

    #[test]
    fn test_path_resolution() {
        let config = Config::default();

        assert!(config.log_dir().ends_with("data/logs"));
        assert!(config.sqlite_path().ends_with("data/profiles.db"));
        assert!(config.session_path().ends_with("data/session.json"));
    }
}
