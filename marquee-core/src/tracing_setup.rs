//! Tracing setup for Marquee
//!
//! Console output follows the level the operator picks; when a log directory
//! is given, every event down to TRACE is also written to
//! `<dir>/marquee-last-run.log` so a degraded scrape can be diagnosed after
//! the fact.

use std::fs::{File, create_dir_all};
use std::path::Path;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// HTML parser internals are chatty at debug level and never useful here.
const QUIET_DEPENDENCIES: &str = "html5ever=warn,selectors=warn,hyper_util=info";

/// Initialize tracing with console output and an optional full-trace log file.
///
/// `RUST_LOG` takes precedence over `console_level` for the console layer.
///
/// # Errors
///
/// - `MarqueeError::Io` - If the log directory cannot be created or the log
///   file cannot be opened for writing
pub fn init_tracing(console_level: Level, logs_dir: Option<&Path>) -> crate::Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{console_level},{QUIET_DEPENDENCIES}")));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let file_layer = match logs_dir {
        Some(dir) => {
            create_dir_all(dir)?;
            let log_file = File::create(dir.join("marquee-last-run.log"))?;
            Some(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(log_file))
                    .with_filter(EnvFilter::new(format!("trace,{QUIET_DEPENDENCIES}"))),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::debug!(
        "Tracing initialized: console={}, log_dir={:?}",
        console_level,
        logs_dir
    );

    Ok(())
}

/// CLI log levels for user control
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliLogLevel {
    /// Only error messages
    Error,
    /// Warnings, including dropped items and degraded scrapes
    Warn,
    /// Resolution summaries
    Info,
    /// Cache hits and misses, fetched URLs
    Debug,
    /// Everything
    Trace,
}

impl CliLogLevel {
    /// Converts CLI log level to the tracing level.
    ///
    /// # Examples
    /// ```
    /// use marquee_core::tracing_setup::CliLogLevel;
    ///
    /// assert_eq!(CliLogLevel::Warn.as_tracing_level(), tracing::Level::WARN);
    /// ```
    pub fn as_tracing_level(self) -> Level {
        match self {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(CliLogLevel::Error.as_tracing_level(), Level::ERROR);
        assert_eq!(CliLogLevel::Info.as_tracing_level(), Level::INFO);
        assert_eq!(CliLogLevel::Trace.as_tracing_level(), Level::TRACE);
    }
}
