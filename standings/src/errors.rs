//! Error types for standings acquisition.
//!
//! Transport failures are described by [`FetchError`]; everything an adapter
//! can surface to its caller is a [`StandingsError`].

use std::time::Duration;
use thiserror::Error;

/// A failed HTTP exchange, classified by cause.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The request did not complete within its timeout.
    #[error("timed out after {timeout:?} fetching {url}")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {code} fetching {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        code: u16,
        /// Response body, kept for judges that report errors in it.
        body: String,
    },

    /// The connection could not be established or was reset.
    #[error("connection error fetching {url}: {message}")]
    Connection {
        /// Requested URL.
        url: String,
        /// Underlying error message.
        message: String,
    },
}

impl FetchError {
    /// Returns the URL the failed request targeted.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url, .. } | Self::Status { url, .. } | Self::Connection { url, .. } => url,
        }
    }

    /// Returns the HTTP status code, if the failure was a status error.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether retrying the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Connection { .. } => true,
            Self::Status { code, .. } => *code == 429 || (500..600).contains(code),
        }
    }
}

/// The main error type for standings operations.
#[derive(Debug, Error)]
pub enum StandingsError {
    /// A required URL or id cannot be resolved from the descriptor.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The transport failed, after the local retry budget if it was transient.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The fetch succeeded but produced no usable rows.
    #[error("empty standings{}", url.as_deref().map(|u| format!(" at {u}")).unwrap_or_default())]
    EmptyStandings {
        /// Standings URL that was parsed.
        url: Option<String>,
    },

    /// The remote contest cannot be located at all.
    #[error("standings unavailable: {0}")]
    StandingsUnavailable(String),

    /// Some detail fetches failed; the document carries the remaining rows.
    #[error("partial enrichment: {failed} failed and {skipped} skipped of {total} units")]
    PartialEnrichment {
        /// Units whose retries were exhausted.
        failed: usize,
        /// Units never scheduled after a soft stop.
        skipped: usize,
        /// Units submitted.
        total: usize,
    },

    /// Markup or payload did not have the expected shape.
    #[error("parse error in {context}: {message}")]
    Parse {
        /// URL and row index or other location hint.
        context: String,
        /// What was wrong.
        message: String,
    },
}

impl StandingsError {
    /// Creates a parse error.
    #[must_use]
    pub fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the failed operation may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Fetch(e) if e.is_transient())
    }

    /// Short machine-readable error kind, used for phase failure logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Fetch(e) if e.is_transient() => "transient_fetch",
            Self::Fetch(_) => "fetch",
            Self::EmptyStandings { .. } => "empty_standings",
            Self::StandingsUnavailable(_) => "standings_unavailable",
            Self::PartialEnrichment { .. } => "partial_enrichment",
            Self::Parse { .. } => "parse",
        }
    }
}

/// Result alias for standings operations.
pub type Result<T, E = StandingsError> = std::result::Result<T, E>;

/// Parses a JSON payload, attributing failures to `context`.
pub fn parse_json<T: serde::de::DeserializeOwned>(text: &str, context: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| StandingsError::parse(context, e.to_string()))
}
