//! Logging infrastructure for AnimeStream.
//!
//! Structured `tracing` output to the console and, optionally, to a
//! daily-rotated file.

use crate::config::Config;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Crates whose events are enabled at the configured level
const WORKSPACE_TARGETS: &[&str] = &["shared", "catalog", "streaming", "accounts"];

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log directory path
    pub log_dir: String,
    /// Component name (used for log file naming)
    pub component: String,
    /// Default log level
    pub default_level: Level,
    /// Enable console output
    pub console: bool,
    /// Enable file output
    pub file: bool,
    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: "data/logs".to_string(),
            component: "animestream".to_string(),
            default_level: Level::INFO,
            console: true,
            file: false,
            json_format: false,
        }
    }
}

impl LogConfig {
    /// Build a logging configuration from the `[logging]` section
    ///
    /// `verbose` forces DEBUG regardless of the configured level.
    pub fn from_config(config: &Config, component: &str, verbose: bool) -> Self {
        let default_level = if verbose {
            Level::DEBUG
        } else {
            config
                .logging
                .default_level
                .parse()
                .unwrap_or(Level::INFO)
        };

        Self {
            log_dir: config.log_dir().to_string_lossy().to_string(),
            component: component.to_string(),
            default_level,
            console: config.logging.console,
            file: config.logging.file,
            json_format: config.logging.json_format,
        }
    }

    /// Filter directives used when `RUST_LOG` is not set
    fn filter_directives(&self) -> String {
        let mut directives = vec![format!(
            "{}={}",
            self.component.replace('-', "_"),
            self.default_level
        )];
        directives.extend(
            WORKSPACE_TARGETS
                .iter()
                .map(|target| format!("{}={}", target, self.default_level)),
        );
        directives.push("hyper=warn,reqwest=warn,h2=warn,rusqlite=warn".to_string());
        directives.join(",")
    }
}

/// Initialize logging with the given configuration
pub fn init(config: LogConfig) -> Result<()> {
    // Default to configured level, but allow override via RUST_LOG
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directives()));

    let mut layers = Vec::new();

    // Player output shares the terminal, so console logs go to stderr
    if config.console {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_span_events(FmtSpan::NONE)
            .with_writer(std::io::stderr)
            .boxed();
        layers.push(console_layer);
    }

    if config.file {
        let log_dir = Path::new(&config.log_dir);
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", config.log_dir))?;

        let file_appender = tracing_appender::rolling::daily(log_dir, &config.component);

        let file_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_target(true)
                .with_level(true)
                .with_current_span(true)
                .with_span_list(false)
                .with_writer(file_appender)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(file_appender)
                .boxed()
        };

        layers.push(file_layer);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(
        component = %config.component,
        log_dir = %config.log_dir,
        file = config.file,
        "Logging initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config() {
        let config = LogConfig::default();
        assert_eq!(config.component, "animestream");
        assert_eq!(config.default_level, Level::INFO);
        assert!(config.console);
        assert!(!config.file);
    }

    #[test]
    fn test_from_config_levels() {
        let mut config = Config::default();
        config.logging.default_level = "warn".to_string();

        let quiet = LogConfig::from_config(&config, "anime-cli", false);
        assert_eq!(quiet.default_level, Level::WARN);

        let verbose = LogConfig::from_config(&config, "anime-cli", true);
        assert_eq!(verbose.default_level, Level::DEBUG);

        config.logging.default_level = "loud".to_string();
        let fallback = LogConfig::from_config(&config, "anime-cli", false);
        assert_eq!(fallback.default_level, Level::INFO);
    }

    #[test]
    fn test_filter_directives_cover_workspace() {
        let config = LogConfig {
            component: "anime-cli".to_string(),
            default_level: Level::DEBUG,
            ..Default::default()
        };

        let directives = config.filter_directives();
        assert!(directives.starts_with("anime_cli=DEBUG"));
        assert!(directives.contains("streaming=DEBUG"));
        assert!(directives.contains("reqwest=warn"));
    }
}
