//! Logging infrastructure for the media_listener client
//!
//! The client crates only emit `tracing` events. Applications embedding
//! them call [`init_logging_with_config`] once at startup, or install their
//! own subscriber and use [`library_filter`] to scope the client's output.
//!
//! Errors handed to the default error sink are logged under
//! [`ERROR_TARGET`], so they can be routed separately from connection
//! chatter (see [`LogConfig::error_log`]).

use std::fs::File;

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::{paths, ClientError, Result};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "MEDIA_LISTENER_LOG";

/// Target used for errors and connection transitions reported to the sink
pub const ERROR_TARGET: &str = "media_listener::errors";

/// Crates whose events [`library_filter`] raises above the base level
const LIBRARY_TARGETS: [&str; 3] = [
    "media_listener_client",
    "media_listener_protocol",
    "media_listener_utils",
];

const DEFAULT_LOG_FILE: &str = "media-listener.log";
const ERROR_LOG_FILE: &str = "media-listener-errors.log";

/// Filter directive showing the client crates at `level`
///
/// Everything else in the host application stays at `warn`, as do the
/// crates' dependencies (tokio, etc.).
pub fn library_filter(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    let mut directives = vec!["warn".to_string()];
    directives.extend(
        LIBRARY_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level)),
    );
    directives.push(format!("{}={}", ERROR_TARGET, level));
    directives.join(",")
}

/// Log output destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stderr,
    /// Log file under the state directory
    File,
    Both,
}

impl LogOutput {
    fn to_stderr(self) -> bool {
        matches!(self, Self::Stderr | Self::Both)
    }

    fn to_file(self) -> bool {
        matches!(self, Self::File | Self::Both)
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output destination
    pub output: LogOutput,
    /// `EnvFilter` directives (see [`library_filter`])
    pub filter: String,
    /// Include span events (enter/exit)
    pub span_events: bool,
    /// Include file/line in logs
    pub file_line: bool,
    /// Log file name inside [`paths::log_dir`]; defaults to "media-listener.log"
    pub file_name: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: library_filter(Level::INFO),
            span_events: false,
            file_line: false,
            file_name: None,
        }
    }
}

impl LogConfig {
    /// Config for an application consuming events
    ///
    /// Reads the filter from `MEDIA_LISTENER_LOG`; otherwise only warnings
    /// and errors are shown.
    pub fn client() -> Self {
        Self {
            filter: std::env::var(LOG_ENV).unwrap_or_else(|_| library_filter(Level::WARN)),
            ..Self::default()
        }
    }

    /// Config that appends sink-reported errors and connection transitions
    /// to `media-listener-errors.log`, and nothing else
    pub fn error_log() -> Self {
        Self {
            output: LogOutput::File,
            filter: format!("off,{}=debug", ERROR_TARGET),
            span_events: false,
            file_line: false,
            file_name: Some(ERROR_LOG_FILE.into()),
        }
    }

    /// Config for development (client crates at trace, verbose stderr)
    pub fn development() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: library_filter(Level::TRACE),
            span_events: true,
            file_line: true,
            file_name: None,
        }
    }

    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Log file name used when the output includes a file
    pub fn file_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or(DEFAULT_LOG_FILE)
    }
}

/// Initialize logging with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(LogConfig::default())
}

/// Initialize logging with custom configuration
///
/// Fails if the filter does not parse, the log file cannot be opened, or a
/// global subscriber is already installed.
pub fn init_logging_with_config(config: LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| ClientError::config(format!("Invalid log filter: {}", e)))?;

    let span_events = if config.span_events {
        FmtSpan::ENTER | FmtSpan::EXIT
    } else {
        FmtSpan::NONE
    };

    let stderr_layer = config.output.to_stderr().then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(config.file_line)
            .with_line_number(config.file_line)
            .with_span_events(span_events.clone())
    });

    let file_layer = if config.output.to_file() {
        let file = open_log_file(config.file_name())?;
        Some(
            fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_file(config.file_line)
                .with_line_number(config.file_line)
                .with_span_events(span_events),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ClientError::internal(format!("Failed to init logging: {}", e)))?;

    tracing::debug!(filter = %config.filter, output = ?config.output, "Logging initialized");
    Ok(())
}

fn open_log_file(file_name: &str) -> Result<File> {
    let log_dir = paths::log_dir();
    paths::ensure_dir(&log_dir).map_err(|e| ClientError::FileWrite {
        path: log_dir.clone(),
        source: e,
    })?;

    let log_path = log_dir.join(file_name);
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| ClientError::FileWrite {
            path: log_path,
            source: e,
        })
}
