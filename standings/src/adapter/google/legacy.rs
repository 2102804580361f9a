//! Legacy Code Jam and Kick Start scoreboards (`code.google.com`,
//! `codejam.withgoogle.com`).

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use super::api::page_count;
use crate::adapter::{is_requested, FetchPhase, PhaseTracker, Session};
use crate::config::StandingsConfig;
use crate::engine::{FetchEngine, UnitOutcome};
use crate::errors::{parse_json, Result, StandingsError};
use crate::models::{ParticipantRow, Place, ProblemDescriptor, ProblemResult, ProblemSet, ScoreValue, StandingsDocument};
use crate::normalize::format_time;

static VARIABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"GCJ\.(?P<key>\S*)\s*=\s*"?(?P<value>[^";]*)"#).expect("valid regex"));

static PROBLEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"GCJ\.problems\.push\((?P<problem>\{[^}]*\})").expect("valid regex"));

static SUBTASK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?P<new>\(\);)?\s*io\.push\((?P<subtask>\{[^}]*\})").expect("valid regex"));

/// Scoreboard settings declared by the page script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSettings {
    /// Contest id.
    pub contest_id: String,
    /// CSRF token echoed by page queries.
    pub csrf_token: String,
    /// Rows per scoreboard page.
    pub rows_per_page: usize,
}

/// One scoreboard page.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreboardPage {
    /// Paging statistics.
    pub stat: PageStat,
    /// Rows.
    #[serde(default)]
    pub rows: Vec<LegacyRow>,
}

/// Paging statistics.
#[derive(Debug, Clone, Deserialize)]
pub struct PageStat {
    /// Total rows.
    pub nrp: usize,
}

/// One scoreboard row.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyRow {
    /// Handle.
    #[serde(rename = "n")]
    pub handle: String,
    /// Country.
    #[serde(rename = "c", default)]
    pub country: Option<String>,
    /// Penalty seconds.
    #[serde(rename = "pen", default)]
    pub penalty: i64,
    /// Points.
    #[serde(rename = "pts", default)]
    pub points: f64,
    /// Rank.
    #[serde(rename = "r")]
    pub rank: u32,
    /// Attempts per subtask.
    #[serde(rename = "att", default)]
    pub attempts: Vec<u32>,
    /// Solve time per subtask, `-1` when unsolved.
    #[serde(rename = "ss", default)]
    pub times: Vec<i64>,
}

/// Default standings URL of a dashboard URL.
#[must_use]
pub fn scoreboard_url(url: &str) -> String {
    url.replace("/dashboard", "/scoreboard")
}

/// Reads `GCJ.key = value` assignments.
pub fn parse_settings(page: &str, url: &str) -> Result<PageSettings> {
    let variables: HashMap<&str, &str> = VARIABLE_RE
        .captures_iter(page)
        .filter_map(|c| Some((c.name("key")?.as_str(), c.name("value")?.as_str())))
        .collect();
    let get = |key: &str| {
        variables
            .get(key)
            .map(|v| v.trim().to_string())
            .ok_or_else(|| StandingsError::parse(url, format!("GCJ.{key} not found")))
    };
    Ok(PageSettings {
        contest_id: get("contestId")?,
        csrf_token: get("csrfMiddlewareToken")?,
        rows_per_page: get("rowsPerPage")?
            .parse()
            .map_err(|e| StandingsError::parse(url, format!("rowsPerPage: {e}")))?,
    })
}

/// Builds the problem list: one entry per subtask, coded by subtask index.
pub fn parse_problems(page: &str, url: &str) -> Result<Vec<ProblemDescriptor>> {
    let problems: Vec<Value> = PROBLEM_RE
        .captures_iter(page)
        .filter_map(|c| c.name("problem"))
        .map(|m| parse_json(m.as_str(), url))
        .collect::<Result<_>>()?;

    let mut subtasks = Vec::new();
    let mut task: Option<usize> = None;
    for (index, captures) in SUBTASK_RE.captures_iter(page).enumerate() {
        if captures.name("new").is_some() {
            task = Some(task.map_or(0, |t| t + 1));
        }
        let Some(subtask) = captures.name("subtask") else {
            continue;
        };
        let subtask: Value = parse_json(subtask.as_str(), url)?;
        let problem = task
            .and_then(|t| problems.get(t))
            .ok_or_else(|| StandingsError::parse(url, format!("subtask {index} has no problem")))?;

        let code = index.to_string();
        subtasks.push(ProblemDescriptor {
            code: Some(code.clone()),
            name: problem.get("title").and_then(Value::as_str).map(str::to_string),
            full_score: subtask.get("points").and_then(Value::as_f64),
            ..ProblemDescriptor::new(code)
        });
    }
    Ok(subtasks)
}

/// Scoreboard page query URL.
pub fn page_url(standings_url: &str, settings: &PageSettings, page: usize) -> Result<String> {
    let mut url = reqwest::Url::parse(&format!("{}/do", standings_url.trim_end_matches('/')))
        .map_err(|e| StandingsError::Configuration(format!("standings url {standings_url}: {e}")))?;
    url.query_pairs_mut()
        .append_pair("cmd", "GetScoreboard")
        .append_pair("contest_id", &settings.contest_id)
        .append_pair("show_type", "all")
        .append_pair("start_pos", &(page * settings.rows_per_page + 1).to_string())
        .append_pair("csrfmiddlewaretoken", &settings.csrf_token);
    Ok(url.to_string())
}

/// Builds a row. Solved subtasks read `+` or `+N`, failed ones `-attempts`.
#[must_use]
pub fn build_row(row: &LegacyRow) -> ParticipantRow {
    let mut participant = ParticipantRow::new(row.handle.clone(), Place::Rank(row.rank));
    participant.country = row.country.clone().filter(|c| !c.is_empty());
    participant.penalty = Some(format_time(row.penalty));
    participant.solving = row.points;

    for (index, (attempts, time)) in row.attempts.iter().zip(&row.times).enumerate() {
        if *attempts == 0 {
            continue;
        }
        let result = if *time == -1 {
            ProblemResult {
                result: Some(ScoreValue::Number(-f64::from(*attempts))),
                ..ProblemResult::default()
            }
        } else {
            let marker = if *attempts == 1 { "+".to_string() } else { format!("+{}", attempts - 1) };
            ProblemResult {
                result: Some(ScoreValue::Text(marker)),
                time: Some(format_time(*time)),
                ..ProblemResult::default()
            }
        };
        participant.problems.insert(index.to_string(), result);
    }
    participant.recount_solved();
    participant
}

async fn fetch_page(session: &Session, url: String) -> Result<ScoreboardPage> {
    parse_json(&session.get_once(&url).await?, &url)
}

/// Fetches a legacy scoreboard into `document`.
pub async fn fetch(
    session: &Session,
    config: &StandingsConfig,
    standings_url: &str,
    users: Option<&HashSet<String>>,
    document: &mut StandingsDocument,
    tracker: &mut PhaseTracker,
) -> Result<()> {
    tracker.advance(FetchPhase::Listing);
    let page = session.get(standings_url).await?;
    let settings = parse_settings(&page, standings_url)?;
    document.problems = ProblemSet::List(parse_problems(&page, standings_url)?);
    document.url = Some(standings_url.to_string());

    let first_url = page_url(standings_url, &settings, 0)?;
    let first: ScoreboardPage = parse_json(&session.get(&first_url).await?, &first_url)?;
    let pages = page_count(first.stat.nrp, settings.rows_per_page);
    let urls = (1..pages)
        .map(|p| page_url(standings_url, &settings, p))
        .collect::<Result<Vec<_>>>()?;

    let engine = FetchEngine::new("google legacy pages", config.phases.page_workers)
        .with_retry(session.retry().clone());
    let outcomes = engine.run(urls, |url| fetch_page(session, url)).await;

    let mut pages_data = vec![first];
    for outcome in outcomes {
        match outcome {
            UnitOutcome::Completed { value, .. } => pages_data.push(value),
            UnitOutcome::Failed { error, .. } => return Err(error),
            UnitOutcome::Skipped { .. } => {}
        }
    }
    for row in pages_data.iter().flat_map(|p| &p.rows) {
        if is_requested(users, &row.handle) {
            document.result.insert(row.handle.clone(), build_row(row));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const DASHBOARD: &str = r#"
<script>
GCJ.contestId = "3324486";
GCJ.csrfMiddlewareToken = "tok123";
GCJ.rowsPerPage = 30;
GCJ.problems.push({"title": "Big Buttons", "id": "1"});
GCJ.problems.push({"title": "Mural", "id": "2"});
var io = new Array();io.push({"points": 5, "difficulty": "small"});
io.push({"points": 9, "difficulty": "large"});
io = new Array();io.push({"points": 13, "difficulty": "small"});
</script>"#;

    pub fn scoreboard(total: usize, rows: &str) -> String {
        format!(r#"{{"stat": {{"nrp": {total}}}, "rows": [{rows}]}}"#)
    }

    pub const ROW: &str = r#"{"n": "Gennady.Korotkevich", "c": "Belarus", "pen": 3723, "pts": 14, "r": 1,
        "att": [1, 3, 2], "ss": [300, 900, -1]}"#;
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use pretty_assertions::assert_eq;

    const URL: &str = "https://code.google.com/codejam/contest/3324486/scoreboard";

    #[test]
    fn test_scoreboard_url() {
        assert_eq!(scoreboard_url("https://code.google.com/codejam/contest/3324486/dashboard"), URL);
    }

    #[test]
    fn test_parse_settings() {
        let settings = parse_settings(DASHBOARD, URL).unwrap();
        assert_eq!(settings.contest_id, "3324486");
        assert_eq!(settings.csrf_token, "tok123");
        assert_eq!(settings.rows_per_page, 30);
        assert!(parse_settings("<html></html>", URL).is_err());
    }

    #[test]
    fn test_parse_problems_per_subtask() {
        let problems = parse_problems(DASHBOARD, URL).unwrap();
        assert_eq!(problems.len(), 3);
        assert_eq!(problems[1].short, "1");
        assert_eq!(problems[1].name.as_deref(), Some("Big Buttons"));
        assert_eq!(problems[1].full_score, Some(9.0));
        assert_eq!(problems[2].name.as_deref(), Some("Mural"));
    }

    #[test]
    fn test_page_url() {
        let settings = parse_settings(DASHBOARD, URL).unwrap();
        assert_eq!(
            page_url(URL, &settings, 2).unwrap(),
            "https://code.google.com/codejam/contest/3324486/scoreboard/do?cmd=GetScoreboard&contest_id=3324486&show_type=all&start_pos=61&csrfmiddlewaretoken=tok123"
        );
    }

    #[test]
    fn test_build_row() {
        let page: ScoreboardPage = parse_json(&scoreboard(1, ROW), "test").unwrap();
        let row = build_row(&page.rows[0]);
        assert_eq!(row.penalty.as_deref(), Some("1:02:03"));
        assert_eq!(row.problems["0"].result, Some(ScoreValue::Text("+".into())));
        assert_eq!(row.problems["0"].time.as_deref(), Some("5:00"));
        assert_eq!(row.problems["1"].result, Some(ScoreValue::Text("+2".into())));
        assert_eq!(row.problems["2"].result, Some(ScoreValue::Number(-2.0)));
        assert_eq!(row.solved.solving, 2);
        assert!(row.is_consistent());
    }
}
