//! Error types for catalog resolution.

use thiserror::Error;

/// Errors that can occur while resolving catalog requests.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// Page request exceeded the configured timeout.
    #[error("Request timed out: {url}")]
    Timeout {
        /// The URL that timed out
        url: String,
    },

    /// Could not open a connection to the upstream host.
    #[error("Failed to connect to {url}: {reason}")]
    ConnectionFailed {
        /// The URL being fetched
        url: String,
        /// The reason for the connection failure
        reason: String,
    },

    /// Upstream answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// The URL being fetched
        url: String,
        /// The status code returned
        status: u16,
    },

    /// The exchange broke off after it started (reset mid-request, body read).
    #[error("Transport error for {url}: {reason}")]
    TransportFailed {
        /// The URL being fetched
        url: String,
        /// The reason for the failure
        reason: String,
    },

    /// The request could not be built or its redirects could not be followed.
    #[error("Request to {url} rejected: {reason}")]
    RequestRejected {
        /// The URL being fetched
        url: String,
        /// Why the request was abandoned
        reason: String,
    },

    /// A mandatory field could not be extracted from one item.
    #[error("Missing mandatory field '{field}'")]
    MissingField {
        /// Name of the missing field
        field: &'static str,
    },

    /// A selector in the extraction table does not parse as CSS.
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector {
        /// The offending selector text
        selector: String,
        /// Parser diagnostic
        reason: String,
    },

    /// Caller supplied a content kind other than `movie` or `series`.
    #[error("Invalid content kind: {kind}")]
    InvalidKind {
        /// The rejected kind
        kind: String,
    },

    /// Caller omitted the content identifier.
    #[error("Missing content identifier")]
    MissingIdentifier,

    /// Identifier does not carry this catalog's namespace prefix.
    #[error("Identifier '{id}' does not belong to this catalog")]
    UnknownNamespace {
        /// The rejected identifier
        id: String,
    },

    /// Season/episode coordinates are incomplete or do not apply to the kind.
    #[error("Invalid episode coordinates: {reason}")]
    InvalidEpisode {
        /// Why the coordinates were rejected
        reason: String,
    },
}

/// Coarse classification deciding how the pipeline reacts to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Upstream flakiness: degrade the call to an empty result
    Transport,
    /// Markup did not yield a usable item: drop the item
    Extraction,
    /// Caller misuse: reject the request
    Validation,
}

impl CatalogError {
    /// Classifies this error for the pipeline's boundary mapping.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CatalogError::Timeout { .. }
            | CatalogError::ConnectionFailed { .. }
            | CatalogError::HttpStatus { .. }
            | CatalogError::TransportFailed { .. }
            | CatalogError::RequestRejected { .. } => ErrorCategory::Transport,
            CatalogError::MissingField { .. } | CatalogError::InvalidSelector { .. } => {
                ErrorCategory::Extraction
            }
            CatalogError::InvalidKind { .. }
            | CatalogError::MissingIdentifier
            | CatalogError::UnknownNamespace { .. }
            | CatalogError::InvalidEpisode { .. } => ErrorCategory::Validation,
        }
    }

    /// Whether a retry could plausibly succeed.
    ///
    /// Timeouts, failed or broken connections, 5xx and 429 are transient; any
    /// other status (notably 4xx), rejected requests and all non-transport
    /// errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::Timeout { .. }
            | CatalogError::ConnectionFailed { .. }
            | CatalogError::TransportFailed { .. } => true,
            CatalogError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Checks if this error was caused by the caller's input.
    pub fn is_user_error(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }
}
