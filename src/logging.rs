//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and a JSON or
//! pretty `fmt` layer. `RUST_LOG` wins when set; otherwise the level comes
//! from `LR_LOG_LEVEL`.
//!
//! ## Environment Variables
//!
//! - `LR_LOG_LEVEL`: trace/debug/info/warn/error (default `info`)
//! - `LR_LOG_FORMAT`: `json` or `pretty` (default `json`)
//! - `LR_LOG_TARGET_FILTER`: extra comma-separated filter directives
//! - `LR_LOG_INCLUDE_LOCATION`: include file and line (default `false`)
//!
//! Output goes to stderr so CLI output on stdout stays machine readable.

use std::env;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level: trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    /// Extra filter directives (comma-separated)
    pub target_filter: Option<String>,
    /// Include file:line location
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Parse configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: env::var("LR_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: env::var("LR_LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or(defaults.format),
            target_filter: env::var("LR_LOG_TARGET_FILTER").ok(),
            include_location: env::var("LR_LOG_INCLUDE_LOCATION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.include_location),
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));

        if let Some(target_filter) = &self.target_filter {
            for directive in target_filter.split(',').map(str::trim) {
                if directive.is_empty() {
                    continue;
                }
                match directive.parse() {
                    Ok(directive) => filter = filter.add_directive(directive),
                    Err(_) => eprintln!("Warning: Invalid log filter directive: {}", directive),
                }
            }
        }
        filter
    }
}

/// Initialize logging from the environment.
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LogConfig::from_env())
}

/// Initialize logging with an explicit configuration.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_logging_with_config(config: &LogConfig) -> Result<()> {
    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Json);
    }

    #[test]
    fn test_level_parse_falls_back_to_info() {
        let mut config = LogConfig::default();
        assert_eq!(config.level(), Level::INFO);
        config.log_level = "DEBUG".to_string();
        assert_eq!(config.level(), Level::DEBUG);
        config.log_level = "verbose".to_string();
        assert_eq!(config.level(), Level::INFO);
    }
}
