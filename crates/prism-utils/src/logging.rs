//! # Logging Utilities
//!
//! Logging infrastructure for Prism using `tracing`.
//!
//! Rendered values go to stdout, so every log line goes to stderr (and
//! optionally a file). The default level is `warn`: a formatter that declines
//! or a value that can't be read is worth a line, routine lookups are not.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use prism_utils::init_logging;
//!
//! // Keep the guard alive for the life of the program so file output is flushed.
//! let _guard = init_logging().expect("Failed to initialize logging");
//! tracing::warn!("value is unreadable");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: level filter (e.g. `RUST_LOG=debug`, `RUST_LOG=prism_core::registry=trace`)
//! - `PRISM_LOG_FORMAT`: `pretty` (default) or `json`
//! - `PRISM_LOG_FILE`: also write logs to this file; if it names a directory,
//!   to `<dir>/YYYY-MM-DD-prism.log`

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format (default)
    Pretty,
    /// JSON format, one object per line
    Json,
}

impl FromStr for LogFormat
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {s}. Use 'pretty' or 'json'")),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level (default)
    Warn,
    /// Info level
    Info,
    /// Debug level
    Debug,
    /// Trace level (most verbose)
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!(
                "Unknown log level: {s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            )),
        }
    }
}

/// Keeps the background file writer alive. Dropping it flushes pending lines.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug, Default)]
pub struct LoggingGuard
{
    _file: Option<WorkerGuard>,
}

/// Initialize logging from the environment.
///
/// Reads `RUST_LOG`, `PRISM_LOG_FORMAT` and `PRISM_LOG_FILE`.
///
/// ## Errors
///
/// Returns an error if:
/// - `PRISM_LOG_FORMAT` is set to an unknown format
/// - logging is already initialized
/// - the log file can't be created
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    let format = match env::var("PRISM_LOG_FORMAT") {
        Ok(value) => LogFormat::from_str(&value).map_err(LoggingError::InvalidFormat)?,
        Err(_) => LogFormat::Pretty,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string()));
    init_logging_internal(format, filter)
}

/// Initialize logging with an explicit level and format.
///
/// `PRISM_LOG_FILE` is still honoured; `RUST_LOG` is not.
///
/// ## Example
///
/// ```rust,no_run
/// use prism_utils::{LogFormat, LogLevel, init_logging_with_level};
///
/// let _guard = init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
///     .expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if logging is already initialized or file logging fails.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    init_logging_internal(format, EnvFilter::new(Level::from(level).to_string()))
}

/// Where `PRISM_LOG_FILE` points: a file, or a dated file inside a directory.
fn resolve_log_file(path: &Path) -> PathBuf
{
    if path.is_dir() {
        let today = Utc::now().format("%Y-%m-%d");
        path.join(format!("{today}-prism.log"))
    } else {
        path.to_path_buf()
    }
}

fn format_layer<W>(format: LogFormat, writer: W, ansi: bool, filter: EnvFilter) -> BoxedLayer
where
    W: for<'writer> fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(ansi)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
    }
}

fn init_logging_internal(format: LogFormat, filter: EnvFilter) -> Result<LoggingGuard, LoggingError>
{
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = LoggingGuard::default();

    if let Some(path) = env::var_os("PRISM_LOG_FILE").map(PathBuf::from) {
        let log_file = resolve_log_file(&path);
        let directory = log_file.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        std::fs::create_dir_all(&directory)?;
        let file_name = log_file
            .file_name()
            .ok_or_else(|| LoggingError::InvalidFile(log_file.display().to_string()))?;

        // The date is already part of the name when it matters.
        let file_appender = tracing_appender::rolling::never(&directory, file_name);
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
        layers.push(format_layer(format, non_blocking, false, filter.clone()));
        guard._file = Some(file_guard);
    }
    layers.push(format_layer(format, io::stderr, true, filter));

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
    Ok(guard)
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Log file path has no file name
    #[error("Invalid log file: {0}")]
    InvalidFile(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_log_format_from_str()
    {
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("prod").unwrap(), LogFormat::Json);
        assert!(LogFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_log_level_from_str()
    {
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("dbg").unwrap(), LogLevel::Debug);
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
        assert!(LogLevel::from_str("loud").is_err());
    }

    #[test]
    fn test_log_file_in_directory_is_dated()
    {
        let dir = env::temp_dir();
        let file = resolve_log_file(&dir);
        let name = file.file_name().and_then(|name| name.to_str()).unwrap();
        assert!(name.ends_with("-prism.log"), "{name}");
        assert_eq!(name.len(), "YYYY-MM-DD-prism.log".len());

        let explicit = dir.join("prism-test-explicit.log");
        assert_eq!(resolve_log_file(&explicit), explicit);
    }
}
