//! Logging setup and fetch spans.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::errors::{Result, StandingsError};

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Plain,
    /// One JSON object per event.
    Json,
}

/// Installs the global `tracing` subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Fails when a
/// global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = match format {
        LogFormat::Plain => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| StandingsError::Configuration(format!("tracing subscriber: {e}")))
}

/// Span wrapping one `fetch_standings` call, tagged with a fresh session id.
#[must_use]
pub fn fetch_span(adapter: &str, contest_key: &str) -> tracing::Span {
    let session_id = uuid::Uuid::now_v7();
    tracing::info_span!(
        "fetch_standings",
        adapter,
        contest = contest_key,
        session_id = %session_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_serde() {
        assert_eq!(serde_json::to_string(&LogFormat::Json).unwrap(), "\"json\"");
        let parsed: LogFormat = serde_json::from_str("\"plain\"").unwrap();
        assert_eq!(parsed, LogFormat::Plain);
    }

    #[test]
    fn test_second_init_fails() {
        let _ = init_tracing(LogFormat::Plain);
        assert!(init_tracing(LogFormat::Json).is_err());
    }
}
