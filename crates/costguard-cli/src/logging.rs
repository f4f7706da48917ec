//! Logging setup for the CostGuard CLI
//!
//! This module provides:
//! - Session ID generation, attached to every command span
//! - Structured logging setup with compact, full, or JSON output
//! - Optional logging to a file instead of stderr
//! - Performance timing spans

use crate::config;
use crate::error::{Error, Result};
use is_terminal::IsTerminal;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{field, Span};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Global session ID for this invocation
static SESSION_ID: OnceLock<String> = OnceLock::new();

/// Effective logging settings after flags, config file and environment are combined
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Log level filter
    pub level: String,
    /// Output format: compact, full, json
    pub format: LogFormat,
    /// Optional file output path; stderr when unset
    pub file: Option<PathBuf>,
    /// Include thread IDs
    pub thread_ids: bool,
    /// Include file and line numbers
    pub source_location: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact format for production
    Compact,
    /// Full format with all details
    Full,
    /// JSON structured format
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "compact" => Some(LogFormat::Compact),
            "full" => Some(LogFormat::Full),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
            file: None,
            thread_ids: false,
            source_location: false,
        }
    }
}

impl LoggingConfig {
    /// Start from the config file's logging section
    pub fn from_config(section: &config::LoggingConfig) -> Self {
        Self {
            level: section.level.clone(),
            format: LogFormat::parse(&section.format).unwrap_or(LogFormat::Compact),
            file: section.file.clone(),
            ..Default::default()
        }
    }

    /// Raise detail according to `-v` count; zero keeps the configured level
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        match verbosity {
            0 => {}
            1 => {
                self.level = "info".to_string();
            }
            2 => {
                self.level = "debug".to_string();
                self.source_location = true;
            }
            _ => {
                self.level = "trace".to_string();
                self.format = LogFormat::Full;
                self.source_location = true;
                self.thread_ids = true;
            }
        }
        self
    }

    /// Apply environment overrides
    pub fn merge_with_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(format) = lookup("COSTGUARD_LOG_FORMAT") {
            match LogFormat::parse(&format) {
                Some(parsed) => self.format = parsed,
                None => eprintln!("Warning: invalid log format '{}', using {:?}", format, self.format),
            }
        }

        if let Some(file) = lookup("COSTGUARD_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }
    }
}

/// Initialize the global logging system. `RUST_LOG` wins over the configured level.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (writer, ansi) = match &config.file {
        Some(path) => (file_writer(path)?, false),
        None => (BoxMakeWriter::new(std::io::stderr), std::io::stderr().is_terminal()),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(config.thread_ids)
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    // Each format produces a distinct subscriber type
    let installed = match config.format {
        LogFormat::Compact => tracing::subscriber::set_global_default(builder.with_ansi(ansi).compact().finish()),
        LogFormat::Full => tracing::subscriber::set_global_default(builder.with_ansi(ansi).finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.with_ansi(false).json().finish()),
    };
    installed.map_err(|e| Error::other(format!("Failed to initialize logging: {}", e)))?;

    let session_id = generate_session_id();
    SESSION_ID
        .set(session_id.clone())
        .map_err(|_| Error::other("Logging was already initialized"))?;

    tracing::debug!(session_id = %session_id, config = ?config, "Logging system initialized");
    Ok(())
}

fn file_writer(path: &std::path::Path) -> Result<BoxMakeWriter> {
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::config(format!("Log file path has no file name: {}", path.display())))?;

    std::fs::create_dir_all(directory)?;
    Ok(BoxMakeWriter::new(tracing_appender::rolling::never(directory, file_name)))
}

/// Generate a unique ID for this CLI session
pub fn generate_session_id() -> String {
    format!("cg_{}", Uuid::new_v4().simple())
}

/// Get the current session ID
pub fn current_session_id() -> Option<&'static str> {
    SESSION_ID.get().map(|s| s.as_str())
}

/// Create a span with session ID and timing
pub fn create_operation_span(operation: &str, details: Option<&str>) -> Span {
    tracing::info_span!(
        "operation",
        operation = operation,
        session_id = current_session_id().unwrap_or("unknown"),
        details = details.unwrap_or(""),
        duration_ms = field::Empty,
    )
}

/// Performance timing utilities
pub mod timing {
    use std::time::Instant;
    use tracing::Span;

    /// A timer that logs its duration when dropped
    pub struct Timer {
        start: Instant,
        span: Span,
        operation: String,
    }

    impl Timer {
        pub fn new(operation: &str) -> Self {
            Self {
                start: Instant::now(),
                span: super::create_operation_span(operation, None),
                operation: operation.to_string(),
            }
        }

        pub fn with_details(operation: &str, details: &str) -> Self {
            Self {
                start: Instant::now(),
                span: super::create_operation_span(operation, Some(details)),
                operation: operation.to_string(),
            }
        }

        /// The span commands should run inside
        pub fn span(&self) -> &Span {
            &self.span
        }

        /// Get elapsed time without finishing the timer
        pub fn elapsed(&self) -> std::time::Duration {
            self.start.elapsed()
        }
    }

    impl Drop for Timer {
        fn drop(&mut self) {
            let duration = self.start.elapsed();
            self.span.record("duration_ms", duration.as_millis() as u64);

            tracing::debug!(
                operation = %self.operation,
                duration_ms = duration.as_millis() as u64,
                "Operation completed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_verbosity_levels() {
        let base = LoggingConfig::default();
        assert_eq!(base.clone().with_verbosity(0).level, "warn");
        assert_eq!(base.clone().with_verbosity(1).level, "info");

        let debug = base.clone().with_verbosity(2);
        assert_eq!(debug.level, "debug");
        assert!(debug.source_location);

        let trace = base.with_verbosity(5);
        assert_eq!(trace.level, "trace");
        assert_eq!(trace.format, LogFormat::Full);
        assert!(trace.thread_ids);
    }

    #[test]
    fn test_from_config_section() {
        let section = config::LoggingConfig {
            level: "error".to_string(),
            format: "JSON".to_string(),
            file: Some(PathBuf::from("costguard.log")),
        };
        let logging = LoggingConfig::from_config(&section);
        assert_eq!(logging.level, "error");
        assert_eq!(logging.format, LogFormat::Json);
        assert_eq!(logging.file, Some(PathBuf::from("costguard.log")));
    }

    #[test]
    fn test_env_overrides() {
        let mut logging = LoggingConfig::default();
        logging.merge_with_env(lookup(&[("COSTGUARD_LOG_FORMAT", "full"), ("COSTGUARD_LOG_FILE", "/tmp/cg.log")]));
        assert_eq!(logging.format, LogFormat::Full);
        assert_eq!(logging.file, Some(PathBuf::from("/tmp/cg.log")));

        logging.merge_with_env(lookup(&[("COSTGUARD_LOG_FORMAT", "fancy")]));
        assert_eq!(logging.format, LogFormat::Full);
    }

    #[test]
    fn test_session_id_format() {
        let id = generate_session_id();
        assert!(id.starts_with("cg_"));
        assert_eq!(id.len(), 3 + 32);
        assert_ne!(id, generate_session_id());
    }
}
