//! Member profile lookups.

use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use super::basic_data::{self, Record};
use crate::adapter::Session;
use crate::config::StandingsConfig;
use crate::engine::{FetchEngine, UnitOutcome};
use crate::errors::{FetchError, Result, StandingsError};
use crate::models::ProfileInfo;

const STALE_RETRY: Duration = Duration::from_secs(30 * 24 * 3600);

/// Builds the profile URL, encoding `handle` as the last path segment.
pub fn profile_url(template: &str, handle: &str) -> Result<String> {
    let mut url = reqwest::Url::parse(&template.replace("{handle}", "_"))
        .map_err(|e| StandingsError::Configuration(format!("profile url {template}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| StandingsError::Configuration(format!("profile url {template} cannot have segments")))?
        .pop()
        .push(handle);
    Ok(url.to_string())
}

/// Interprets a profile payload.
///
/// An error payload whose `value` is 404 marks the handle for removal; any
/// other error payload is a parse failure.
pub fn parse_profile(handle: &str, text: &str) -> Result<ProfileInfo> {
    let payload: Value = crate::errors::parse_json(text, handle)?;
    if let Some(error) = payload.get("error") {
        if error.get("value").and_then(Value::as_i64) == Some(404) {
            return Ok(ProfileInfo::removed(handle));
        }
        return Err(StandingsError::parse(handle, format!("profile error: {error}")));
    }

    let mut profile = ProfileInfo::new(
        payload
            .get("handle")
            .and_then(Value::as_str)
            .map_or(handle, str::trim),
    );
    profile.country = payload.get("country").and_then(Value::as_str).map(str::to_string);
    profile.photo = payload
        .get("photoLink")
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
        .map(str::to_string);
    profile.rating = payload
        .get("ratingSummary")
        .and_then(Value::as_array)
        .and_then(|ratings| {
            ratings
                .iter()
                .find(|r| r.get("name").and_then(Value::as_str) == Some("Algorithm"))
        })
        .and_then(|r| r.get("rating"))
        .and_then(Value::as_i64);
    profile.raw = payload;
    Ok(profile)
}

async fn fetch_profile(session: &Session, template: &str, handle: &str) -> Result<ProfileInfo> {
    let url = profile_url(template, handle)?;
    match session.get_once(&url).await {
        Ok(text) => parse_profile(handle, &text),
        Err(StandingsError::Fetch(FetchError::Status { code: 404, body, .. })) => parse_profile(handle, &body),
        Err(e) => Err(e),
    }
}

async fn active_algorithm(session: &Session, config: &StandingsConfig) -> HashMap<String, Record> {
    let url = config
        .topcoder
        .basic_data_url
        .replace("{query}", "c=dd_active_algorithm_list");
    match session.get(&url).await.and_then(|xml| basic_data::parse_records(&xml)) {
        Ok(records) => basic_data::by_handle(records),
        Err(e) => {
            tracing::warn!(url, error = %e, "Active algorithm list unavailable");
            HashMap::new()
        }
    }
}

/// Looks up profiles in input order. Failed lookups yield stale
/// placeholders.
pub async fn fetch_profiles(session: &Session, config: &StandingsConfig, handles: &[String]) -> Vec<ProfileInfo> {
    let active = active_algorithm(session, config).await;
    let template = config.topcoder.profile_api_url.as_str();

    let engine = FetchEngine::new("topcoder profiles", config.phases.profile_workers)
        .with_retry(session.retry_with_attempts(2));
    let outcomes = engine
        .run(handles.iter().cloned().enumerate().collect(), |(index, handle): (usize, String)| async move {
            Ok::<_, StandingsError>((index, fetch_profile(session, template, &handle).await?))
        })
        .await;

    let mut profiles: Vec<(usize, ProfileInfo)> = outcomes
        .into_iter()
        .map(|outcome| match outcome {
            UnitOutcome::Completed { value, .. } => value,
            UnitOutcome::Failed { item: (index, handle), error } => {
                tracing::warn!(handle = %handle, error = %error, "Profile lookup failed");
                (index, ProfileInfo::stale(handle, STALE_RETRY))
            }
            UnitOutcome::Skipped { item: (index, handle) } => (index, ProfileInfo::stale(handle, STALE_RETRY)),
        })
        .collect();
    profiles.sort_by_key(|(index, _)| *index);

    profiles
        .into_iter()
        .map(|(_, mut profile)| {
            if let Some(volatility) = active
                .get(&profile.handle)
                .and_then(|r| r.get("alg_vol"))
                .and_then(|v| v.parse().ok())
            {
                profile.volatility = Some(volatility);
            }
            profile
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileAction;
    use crate::retry::RetryPolicy;
    use crate::testing::{connection_error, status_error, ScriptedRequester};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const TOURIST: &str = r#"{"handle": "tourist", "country": "Belarus", "photoLink": "",
        "ratingSummary": [{"name": "Marathon Match", "rating": 1500}, {"name": "Algorithm", "rating": 3700}]}"#;

    const ACTIVE: &str = r#"<dd_active_algorithm_list>
        <row><handle>tourist</handle><alg_vol>287</alg_vol></row>
    </dd_active_algorithm_list>"#;

    #[test]
    fn test_profile_url_encodes_handle() {
        assert_eq!(
            profile_url("http://api.topcoder.com/v2/users/{handle}", "a b/c").unwrap(),
            "http://api.topcoder.com/v2/users/a%20b%2Fc"
        );
    }

    #[test]
    fn test_parse_profile() {
        let profile = parse_profile("tourist", TOURIST).unwrap();
        assert_eq!(profile.rating, Some(3700));
        assert_eq!(profile.country.as_deref(), Some("Belarus"));
        assert!(profile.photo.is_none());

        let removed = parse_profile("ghost", r#"{"error": {"name": "Not Found", "value": 404}}"#).unwrap();
        assert_eq!(removed.action, Some(ProfileAction::Remove));

        assert!(parse_profile("x", r#"{"error": "rate limited"}"#).is_err());
    }

    #[tokio::test]
    async fn test_fetch_profiles_keeps_order_and_degrades() {
        let requester = Arc::new(
            ScriptedRequester::new()
                .respond("dd_active_algorithm_list", ACTIVE)
                .respond("/users/tourist", TOURIST)
                .respond("/users/ghost", r#"{"error": {"value": 404}}"#)
                .fail("/users/flaky", connection_error("http://api.topcoder.com/v2/users/flaky")),
        );
        let config = StandingsConfig::default();
        let session = Session::new(requester.clone(), &config).with_retry(RetryPolicy::immediate(5));

        let handles = vec!["flaky".to_string(), "tourist".to_string(), "ghost".to_string()];
        let profiles = fetch_profiles(&session, &config, &handles).await;

        let names: Vec<&str> = profiles.iter().map(|p| p.handle.as_str()).collect();
        assert_eq!(names, vec!["flaky", "tourist", "ghost"]);
        assert!(profiles[0].stale);
        assert_eq!(profiles[0].retry_after, Some(STALE_RETRY));
        assert_eq!(profiles[1].volatility, Some(287));
        assert_eq!(profiles[2].action, Some(ProfileAction::Remove));
        assert_eq!(requester.call_count("/users/flaky"), 2);
    }

    #[tokio::test]
    async fn test_transient_profile_failure_is_retried() {
        let requester = Arc::new(
            ScriptedRequester::new()
                .respond("dd_active_algorithm_list", ACTIVE)
                .respond("/users/tourist", TOURIST)
                .fail_once("/users/tourist", status_error("http://api.topcoder.com/v2/users/tourist", 503)),
        );
        let config = StandingsConfig::default();
        let session = Session::new(requester.clone(), &config).with_retry(RetryPolicy::immediate(5));

        let profiles = fetch_profiles(&session, &config, &["tourist".to_string()]).await;

        assert!(!profiles[0].stale);
        assert_eq!(profiles[0].rating, Some(3700));
        assert_eq!(requester.call_count("/users/tourist"), 2);
    }
}
