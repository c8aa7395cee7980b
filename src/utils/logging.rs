//! Diagnostic logging setup.
//!
//! The viewer owns the terminal, so diagnostics go to a file and only when
//! one is requested. Filter precedence: an explicit filter, then
//! `RUST_LOG`, then `info`.

use std::error::Error as StdError;
use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

#[derive(Debug)]
pub enum LoggingError {
    InvalidFilter { directives: String, message: String },
    Open { path: PathBuf, source: std::io::Error },
    Install(String),
}

impl fmt::Display for LoggingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoggingError::InvalidFilter {
                directives,
                message,
            } => write!(f, "invalid log filter `{directives}`: {message}"),
            LoggingError::Open { path, source } => {
                write!(f, "failed to open log file {}: {source}", path.display())
            }
            LoggingError::Install(message) => {
                write!(f, "failed to initialize logging: {message}")
            }
        }
    }
}

impl StdError for LoggingError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            LoggingError::Open { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Filter directives in effect for the given explicit filter.
pub fn resolve_filter(explicit: Option<&str>) -> String {
    explicit
        .map(str::to_owned)
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_FILTER.to_owned())
}

pub fn build_filter(directives: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directives).map_err(|e| LoggingError::InvalidFilter {
        directives: directives.to_owned(),
        message: e.to_string(),
    })
}

/// Install the global subscriber writing to `path`. Without a path logging
/// stays off, and a set `RUST_LOG` earns a hint on stderr.
pub fn init_tracing(path: Option<&Path>, filter: Option<&str>) -> Result<(), LoggingError> {
    let Some(path) = path else {
        if std::env::var_os("RUST_LOG").is_some() {
            eprintln!("RUST_LOG is set, but logging is disabled without --log <FILE>.");
        }
        return Ok(());
    };

    let directives = resolve_filter(filter);
    let env_filter = build_filter(&directives)?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        filter = %directives,
        "logging initialized"
    );
    Ok(())
}
