//! Logging initialization for RelayCast.
//!
//! Supports three formats:
//! - `pretty`: multi-line human-readable output
//! - `component`: compact `LEVEL target message {fields}` lines; use the
//!   [`log_component!`] macro to tag events with a `component` field
//! - `json`: structured JSON lines for log aggregators
//!
//! When `logging.file` is set, output is appended to that file instead of
//! stdout.

use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{RelayError, Result};

/// Install the global tracing subscriber from config.
///
/// `RUST_LOG` wins over `cfg.level` when set. Fails if the log file can't be
/// opened or a subscriber is already installed.
pub fn init_logging(cfg: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));

    let file = match &cfg.file {
        Some(path) => Some(
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?,
        ),
        None => None,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = match (&cfg.format, file) {
        (LogFormat::Json, Some(file)) => builder
            .json()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        (LogFormat::Json, None) => builder.json().try_init(),
        (LogFormat::Pretty, Some(file)) => builder
            .pretty()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        (LogFormat::Pretty, None) => builder.pretty().try_init(),
        (LogFormat::Component, Some(file)) => builder
            .compact()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        (LogFormat::Component, None) => builder.compact().try_init(),
    };

    installed.map_err(|e| RelayError::Config(format!("logging init failed: {}", e)))
}

/// Emit a component-tagged tracing event.
///
/// Works with any tracing level (`trace`, `debug`, `info`, `warn`, `error`):
///
/// ```
/// # use relaycast::log_component;
/// log_component!(info, "router", "broadcast complete");
/// log_component!(warn, "whatsapp", "bridge slow", elapsed_ms = 5200u64);
/// ```
#[macro_export]
macro_rules! log_component {
    ($level:ident, $component:expr, $msg:expr) => {
        tracing::$level!(component = $component, $msg)
    };
    ($level:ident, $component:expr, $msg:expr, $($key:ident = $val:expr),+ $(,)?) => {
        tracing::$level!(component = $component, $($key = $val,)+ $msg)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_logging_config() {
        let cfg = LoggingConfig::default();
        assert_eq!(cfg.format, LogFormat::Component);
        assert_eq!(cfg.level, "info");
        assert!(cfg.file.is_none());
    }

    #[test]
    fn test_log_format_deserialize() {
        let cfg: LoggingConfig =
            serde_json::from_str(r#"{"format":"json","level":"debug"}"#).unwrap();
        assert_eq!(cfg.format, LogFormat::Json);
        assert_eq!(cfg.level, "debug");

        let cfg: LoggingConfig = serde_json::from_str(r#"{"format":"pretty"}"#).unwrap();
        assert_eq!(cfg.format, LogFormat::Pretty);
        assert_eq!(cfg.level, "info");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg: LoggingConfig = serde_json::from_str(r#"{"level":"trace"}"#).unwrap();
        assert_eq!(cfg.format, LogFormat::Component);
        assert!(cfg.file.is_none());
    }

    #[test]
    fn test_unopenable_log_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = LoggingConfig {
            format: LogFormat::Json,
            level: "info".to_string(),
            // A directory can't be opened for appending.
            file: Some(dir.path().to_string_lossy().to_string()),
        };
        assert!(matches!(init_logging(&cfg), Err(RelayError::Io(_))));
    }

    #[test]
    fn test_log_component_macro_compiles() {
        crate::log_component!(debug, "ledger", "recorded");
        crate::log_component!(info, "router", "dispatched", channels = 3usize);
    }
}
