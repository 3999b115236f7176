//! Marquee Core - Configuration and logging foundation
//!
//! Holds the settings every Marquee component reads (upstream catalog
//! location, freshness windows, similarity thresholds, result limits) and the
//! tracing bootstrap shared by binaries and integration tests.

pub mod config;
pub mod tracing_setup;

pub use config::{CacheConfig, LimitsConfig, MarqueeConfig, MatchingConfig, UpstreamConfig};

/// Bootstrap-level failures: bad configuration or unreadable local files.
///
/// Request-time failures live in `marquee-search`; nothing here is raised
/// once the pipeline is serving.
#[derive(Debug, thiserror::Error)]
pub enum MarqueeError {
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MarqueeError {
    /// Returns a short message suitable for printing to a terminal.
    pub fn user_message(&self) -> String {
        match self {
            MarqueeError::Configuration { reason } => format!("Invalid configuration: {reason}"),
            MarqueeError::Io(e) => format!("Could not read local file: {e}"),
        }
    }

    /// Checks if the operator can fix this by changing settings.
    pub fn is_user_error(&self) -> bool {
        matches!(self, MarqueeError::Configuration { .. })
    }
}

pub type Result<T> = std::result::Result<T, MarqueeError>;
