//! Tracing subscriber setup
//!
//! Library code only emits `tracing` events. The binary calls
//! [`init_logging`] once at startup; events go to stderr so formatted
//! positions on stdout stay machine-readable.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing_subscriber::{fmt as tracing_fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event
    Json,
    /// Multi-line, human-readable
    Pretty,
    /// One line per event
    #[default]
    Compact,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Directive string such as `campus_locator::session=debug`; overrides `level`
    pub filter: Option<String>,
}

impl LogConfig {
    /// Errors only, used when the caller wants clean output
    pub fn quiet() -> Self {
        Self {
            level: LogLevel::Error,
            format: LogFormat::Compact,
            filter: None,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        if let Some(directives) = &self.filter {
            match EnvFilter::try_new(directives) {
                Ok(filter) => return filter,
                // No subscriber exists yet to carry this
                Err(e) => eprintln!("ignoring log filter {:?}: {}", directives, e),
            }
        }
        // RUST_LOG wins over the configured level
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.to_string()))
    }
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init_logging(config: &LogConfig) -> bool {
    let filter = config.env_filter();

    let result = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
    };
    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!(LogLevel::Warn.to_string(), "warn");
    }

    #[test]
    fn test_config_deserializes_lowercase() {
        let config: LogConfig = serde_json::from_str(r#"{"level": "debug", "format": "json"}"#).unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.filter, None);

        let config: LogConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn test_repeated_init_is_tolerated() {
        init_logging(&LogConfig::quiet());
        assert!(!init_logging(&LogConfig::quiet()));
    }
}
