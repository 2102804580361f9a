//! Configuration for fetching, retries, worker pools and judge endpoints.
//!
//! Every field has a default so a partial JSON document is a valid
//! configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::errors::{Result, StandingsError};
use crate::retry::RetryPolicy;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandingsConfig {
    /// HTTP settings.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Retry policy for transient failures.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Worker pool sizes per phase.
    #[serde(default)]
    pub phases: PhaseConfig,
    /// Topcoder endpoints.
    #[serde(default)]
    pub topcoder: TopcoderConfig,
    /// Google coding competitions endpoints.
    #[serde(default)]
    pub google: GoogleConfig,
}

impl StandingsConfig {
    /// Parses a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| StandingsError::Configuration(format!("invalid configuration: {e}")))
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            StandingsError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    /// Replaces the retry policy, typically with an immediate one in tests.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Configuration for HTTP fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Default request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Additional headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_timeout() -> f64 {
    30.0
}

fn default_user_agent() -> String {
    concat!("standings/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
            headers: HashMap::new(),
        }
    }
}

impl FetchConfig {
    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds.max(0.0))
    }
}

/// Worker pool sizes and soft-stop threshold per fetch phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseConfig {
    /// Workers for problem statement lookups.
    #[serde(default = "default_problem_workers")]
    pub problem_workers: usize,
    /// Workers for per-participant detail pages.
    #[serde(default = "default_detail_workers")]
    pub detail_workers: usize,
    /// Workers for listing pages and attempt polls.
    #[serde(default = "default_page_workers")]
    pub page_workers: usize,
    /// Workers for profile lookups.
    #[serde(default = "default_profile_workers")]
    pub profile_workers: usize,
    /// Failed detail units tolerated before the batch stops scheduling.
    #[serde(default = "default_failure_threshold")]
    pub detail_failure_threshold: usize,
}

fn default_problem_workers() -> usize {
    3
}

fn default_detail_workers() -> usize {
    20
}

fn default_page_workers() -> usize {
    8
}

fn default_profile_workers() -> usize {
    4
}

fn default_failure_threshold() -> usize {
    10
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            problem_workers: default_problem_workers(),
            detail_workers: default_detail_workers(),
            page_workers: default_page_workers(),
            profile_workers: default_profile_workers(),
            detail_failure_threshold: default_failure_threshold(),
        }
    }
}

/// Topcoder endpoints and discovery constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopcoderConfig {
    /// Match list pages searched during standings URL discovery.
    #[serde(default = "default_match_list_urls")]
    pub match_list_urls: Vec<String>,
    /// Round overview page whose `<option>` list is the discovery fallback.
    #[serde(default = "default_round_overview_url")]
    pub round_overview_url: String,
    /// BasicData feed URL, `{query}` is replaced with the feed parameters.
    #[serde(default = "default_basic_data_url")]
    pub basic_data_url: String,
    /// Marathon match statistics API, `{id}` is the challenge id.
    #[serde(default = "default_mm_api_url")]
    pub marathon_api_url: String,
    /// Member profile API, `{handle}` is the url-encoded handle.
    #[serde(default = "default_profile_api_url")]
    pub profile_api_url: String,
    /// Contests older than this many days are never discovered.
    #[serde(default = "default_discovery_max_age_days")]
    pub discovery_max_age_days: i64,
    /// Allowed distance between listed date and contest start.
    #[serde(default = "default_discovery_window_days")]
    pub discovery_window_days: i64,
    /// Minimum token-set similarity for a discovered title.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

fn default_match_list_urls() -> Vec<String> {
    vec![
        "https://www.topcoder.com/tc?module=MatchList&nr=100500".to_string(),
        "https://community.topcoder.com/longcontest/stats/?module=MatchList&nr=100500".to_string(),
    ]
}

fn default_round_overview_url() -> String {
    "https://community.topcoder.com/stat?c=round_overview&er=1&rd=3000".to_string()
}

fn default_basic_data_url() -> String {
    "https://www.topcoder.com/tc?module=BasicData&{query}".to_string()
}

fn default_mm_api_url() -> String {
    "https://api.topcoder.com/v5/challenges/{id}/statistics".to_string()
}

fn default_profile_api_url() -> String {
    "http://api.topcoder.com/v2/users/{handle}".to_string()
}

fn default_discovery_max_age_days() -> i64 {
    30
}

fn default_discovery_window_days() -> i64 {
    2
}

fn default_similarity_threshold() -> f64 {
    0.618_033_988_75
}

impl Default for TopcoderConfig {
    fn default() -> Self {
        Self {
            match_list_urls: default_match_list_urls(),
            round_overview_url: default_round_overview_url(),
            basic_data_url: default_basic_data_url(),
            marathon_api_url: default_mm_api_url(),
            profile_api_url: default_profile_api_url(),
            discovery_max_age_days: default_discovery_max_age_days(),
            discovery_window_days: default_discovery_window_days(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

/// Google coding competitions endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// Scoreboard poll API, `{id}` is the contest id.
    #[serde(default = "default_scoreboard_url")]
    pub scoreboard_url: String,
    /// Attempts poll API, `{id}` is the contest id.
    #[serde(default = "default_attempts_url")]
    pub attempts_url: String,
    /// Hash Code archive page, `{year}` is the contest year.
    #[serde(default = "default_archive_url")]
    pub archive_url: String,
    /// Hash Code archive data, `{year}` is the contest year.
    #[serde(default = "default_archive_data_url")]
    pub archive_data_url: String,
    /// Rows requested per scoreboard page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_scoreboard_url() -> String {
    "https://codejam.googleapis.com/scoreboard/{id}/poll?p=".to_string()
}

fn default_attempts_url() -> String {
    "https://codejam.googleapis.com/attempts/{id}/poll?p=".to_string()
}

fn default_archive_url() -> String {
    "https://codingcompetitions.withgoogle.com/hashcode/archive/{year}".to_string()
}

fn default_archive_data_url() -> String {
    "https://codingcompetitions.withgoogle.com/data/scoreboards/{year}.json".to_string()
}

fn default_page_size() -> usize {
    200
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            scoreboard_url: default_scoreboard_url(),
            attempts_url: default_attempts_url(),
            archive_url: default_archive_url(),
            archive_data_url: default_archive_data_url(),
            page_size: default_page_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = StandingsConfig::default();
        assert_eq!(config.phases.detail_workers, 20);
        assert_eq!(config.phases.detail_failure_threshold, 10);
        assert_eq!(config.google.page_size, 200);
        assert!((config.topcoder.similarity_threshold - 0.618).abs() < 1e-3);
        assert_eq!(config.fetch.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = StandingsConfig::from_json_str(
            r#"{"phases": {"detail_workers": 5}, "retry": {"max_attempts": 2}}"#,
        )
        .unwrap();
        assert_eq!(config.phases.detail_workers, 5);
        assert_eq!(config.phases.problem_workers, 3);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.base_delay_ms, 3000);
    }

    #[test]
    fn test_invalid_json_is_configuration_error() {
        let err = StandingsConfig::from_json_str("{").unwrap_err();
        assert!(matches!(err, StandingsError::Configuration(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"fetch": {{"timeout_seconds": 5.5}}}}"#).unwrap();
        let config = StandingsConfig::from_file(file.path()).unwrap();
        assert_eq!(config.fetch.timeout(), Duration::from_secs_f64(5.5));
    }

    #[test]
    fn test_missing_file() {
        let err = StandingsConfig::from_file("/nonexistent/standings.json").unwrap_err();
        assert!(matches!(err, StandingsError::Configuration(_)));
    }
}
