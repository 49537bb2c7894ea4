//! Logging utilities for the failover components.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt as layer_fmt, prelude::*};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Log severity accepted in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Names accepted by [`LogLevel::from_str`], in order of severity.
    pub const NAMES: [&'static str; 5] = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

    /// Directive understood by `EnvFilter`.
    ///
    /// tracing has no level above ERROR, so CRITICAL collapses onto it.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARNING"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" => Ok(LogLevel::Critical),
            _ => Err(Error::config(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                s,
                Self::NAMES.join(", ")
            ))),
        }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Everything needed to build the process-wide subscriber.
#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    pub level: LogLevel,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

/// Initialize tracing from explicit options.
///
/// Log lines go to stderr so that stdout stays free for reports. `RUST_LOG`
/// overrides the configured level. When `file` is set, lines are also
/// appended there without ANSI colors; failing to open the file is logged as
/// a warning and does not abort initialization.
pub fn init(options: &LoggingOptions) -> Result<()> {
    let mut layers: Vec<BoxedLayer> = vec![fmt_layer(options.format, std::io::stderr, true)];

    let mut file_error = None;
    if let Some(path) = &options.file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => layers.push(fmt_layer(options.format, Mutex::new(file), false)),
            Err(e) => file_error = Some((path.clone(), e)),
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(options.level.as_filter())),
        )
        .try_init()
        .map_err(Error::logging)?;

    if let Some((path, e)) = file_error {
        tracing::warn!(path = %path.display(), error = %e, "Failed to setup file logging");
    }

    Ok(())
}

fn fmt_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    match format {
        LogFormat::Text => layer_fmt::layer()
            .with_ansi(ansi)
            .with_writer(writer)
            .boxed(),
        LogFormat::Json => layer_fmt::layer().json().with_writer(writer).boxed(),
    }
}
