//! Diagnostics logging setup
//!
//! Installs the process-wide `tracing` subscriber that carries taglog's own
//! diagnostics (file resolution, header checks, sink failures). Tagged and
//! CSV loggers do not go through this subscriber.

use std::path::PathBuf;

use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::{open::FileOpener, paths, Result, TaglogError};

/// Environment variable holding the diagnostics filter
pub const LOG_ENV: &str = "TAGLOG_LOG";

/// File name used under [`paths::log_dir`] when none is configured
pub const DEFAULT_LOG_FILE: &str = "taglog.log";

/// Where diagnostics go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stderr,
    /// A file under the log directory
    File,
    Both,
}

impl LogOutput {
    pub fn to_stderr(self) -> bool {
        matches!(self, Self::Stderr | Self::Both)
    }

    pub fn to_file(self) -> bool {
        matches!(self, Self::File | Self::Both)
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub output: LogOutput,
    /// `EnvFilter` directives, e.g. `warn` or `taglog=debug`
    pub filter: String,
    /// Emit span enter/exit events
    pub span_events: bool,
    /// Include source file and line
    pub file_line: bool,
    /// Log file name; [`DEFAULT_LOG_FILE`] when unset
    pub file_name: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: "info".into(),
            span_events: false,
            file_line: false,
            file_name: None,
        }
    }
}

impl LogConfig {
    /// Quiet stderr output for the command-line tool. `TAGLOG_LOG`
    /// overrides the `warn` default.
    pub fn cli() -> Self {
        Self {
            filter: filter_from_env("warn"),
            ..Self::default()
        }
    }

    /// File output for applications embedding taglog
    pub fn file(file_name: impl Into<String>) -> Self {
        Self {
            output: LogOutput::File,
            filter: filter_from_env("info"),
            file_line: true,
            file_name: Some(file_name.into()),
            ..Self::default()
        }
    }

    /// Verbose stderr output
    pub fn development() -> Self {
        Self {
            filter: "debug".into(),
            span_events: true,
            file_line: true,
            ..Self::default()
        }
    }

    pub fn file_path(&self) -> PathBuf {
        paths::log_dir().join(self.file_name.as_deref().unwrap_or(DEFAULT_LOG_FILE))
    }

    pub fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.filter).map_err(|e| TaglogError::config(format!("Invalid log filter: {}", e)))
    }

    fn fmt_layer<S>(&self) -> fmt::Layer<S>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };

        fmt::layer()
            .with_target(true)
            .with_span_events(span_events)
            .with_file(self.file_line)
            .with_line_number(self.file_line)
    }
}

fn filter_from_env(default: &str) -> String {
    std::env::var(LOG_ENV).unwrap_or_else(|_| default.into())
}

/// Initialize logging with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(LogConfig::default())
}

/// Initialize logging. Fails if a global subscriber is already set.
pub fn init_logging_with_config(config: LogConfig) -> Result<()> {
    let filter = config.env_filter()?;

    let stderr_layer = config
        .output
        .to_stderr()
        .then(|| config.fmt_layer().with_writer(std::io::stderr));

    let file_layer = if config.output.to_file() {
        let file = FileOpener::new().write_only().open(config.file_path())?;
        Some(config.fmt_layer().with_writer(file).with_ansi(false))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| TaglogError::internal(format!("Failed to init logging: {}", e)))
}
