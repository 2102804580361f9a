//! Scoreboard and attempts poll API of codingcompetitions.withgoogle.com.

use chrono::Datelike;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use super::codec;
use crate::adapter::{is_cached_enriched, is_requested, record_enrichment, FetchPhase, PhaseTracker, Session};
use crate::config::StandingsConfig;
use crate::engine::{FetchEngine, UnitOutcome};
use crate::errors::{Result, StandingsError};
use crate::models::{
    AdvanceFilter, Advancement, ContestDescriptor, ParticipantRow, Place, ProblemDescriptor, ProblemResult,
    ProblemSet, ScoreValue, StandingsDocument, Statistics, Subscore,
};
use crate::normalize::{format_micros_penalty, format_time};

static CONTEST_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/([0-9a-f]{16})$").expect("valid regex"));

static CODE_JAM_ROUND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcode.*jam\b.*\bround\b.*\b([123])[A-Z]?$").expect("valid regex"));

/// One scoreboard page.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreboardPage {
    /// Rows on the whole scoreboard.
    #[serde(default)]
    pub full_scoreboard_size: usize,
    /// Contest metadata.
    #[serde(default)]
    pub challenge: Option<Challenge>,
    /// Rows of this page.
    #[serde(default)]
    pub user_scores: Vec<UserScore>,
}

/// Contest metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Challenge {
    /// Tasks in judge order.
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Whether the results are final.
    #[serde(default)]
    pub are_results_final: bool,
    /// Contest start, epoch milliseconds.
    #[serde(default)]
    pub start_ms: i64,
}

/// A task.
#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    /// Task id.
    pub id: String,
    /// Task title.
    #[serde(default)]
    pub title: String,
    /// Test sets.
    #[serde(default)]
    pub tests: Vec<TestSet>,
}

/// A test set and its point value.
#[derive(Debug, Clone, Deserialize)]
pub struct TestSet {
    /// Points.
    #[serde(default)]
    pub value: f64,
}

/// One scoreboard row.
#[derive(Debug, Clone, Deserialize)]
pub struct UserScore {
    /// Handle.
    pub displayname: String,
    /// Rank.
    pub rank: u32,
    /// Total score.
    #[serde(default)]
    pub score_1: f64,
    /// Negated penalty, microseconds.
    #[serde(default)]
    pub score_2: f64,
    /// Country name.
    #[serde(default)]
    pub country: Option<String>,
    /// Per-task results.
    #[serde(default)]
    pub task_info: Vec<TaskInfo>,
}

/// Result of one task in a row.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskInfo {
    /// Task id.
    pub task_id: String,
    /// Points.
    #[serde(default)]
    pub score: f64,
    /// Time penalty, microseconds.
    #[serde(default)]
    pub penalty_micros: f64,
    /// Wrong attempts.
    #[serde(default)]
    pub penalty_attempts: u32,
}

/// Attempts of one participant.
#[derive(Debug, Clone, Deserialize)]
pub struct AttemptsPayload {
    /// Contest metadata.
    #[serde(default)]
    pub challenge: Challenge,
    /// Attempts in arbitrary order.
    #[serde(default)]
    pub attempts: Vec<Attempt>,
}

/// One attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct Attempt {
    /// Task id.
    pub task_id: String,
    /// Submission time, epoch milliseconds.
    #[serde(default)]
    pub timestamp_ms: i64,
    /// Judgement of the test sets.
    #[serde(default)]
    pub judgement: Judgement,
    /// Source text.
    #[serde(default)]
    pub src_content: String,
    /// Language name.
    #[serde(default, rename = "src_language__str")]
    pub language: Option<String>,
}

/// Judgement of an attempt.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Judgement {
    /// Per test set results.
    #[serde(default)]
    pub results: Vec<TestResult>,
}

/// Result of one test set.
#[derive(Debug, Clone, Deserialize)]
pub struct TestResult {
    /// `1` when accepted.
    #[serde(default)]
    pub verdict: Option<i64>,
    /// Verdict text.
    #[serde(default, rename = "verdict__str")]
    pub verdict_text: Option<String>,
    /// Status text when not judged.
    #[serde(default, rename = "status__str")]
    pub status_text: Option<String>,
}

/// Extracts the trailing 16 hex digit contest id.
pub fn contest_id(url: &str) -> Result<&str> {
    CONTEST_ID_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| StandingsError::StandingsUnavailable(format!("no contest id in {url}")))
}

/// Scoreboard query for `count` rows starting at `min_rank`.
#[must_use]
pub fn scoreboard_query(min_rank: usize, count: usize) -> String {
    format!(r#"{{"min_rank":{min_rank},"num_consecutive_users":{count}}}"#)
}

/// Attempts query for one handle.
#[must_use]
pub fn attempts_query(handle: &str) -> String {
    let nickname = serde_json::Value::from(handle);
    format!(r#"{{"nickname":{nickname},"include_non_final_results":true}}"#)
}

/// Number of pages of `page_size` rows.
#[must_use]
pub fn page_count(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1))
}

/// Problems sorted by full score, then name.
#[must_use]
pub fn problems_of(challenge: &Challenge, contest_url: &str) -> Vec<ProblemDescriptor> {
    let base = contest_url.trim_end_matches('/');
    let mut problems: Vec<ProblemDescriptor> = challenge
        .tasks
        .iter()
        .map(|task| ProblemDescriptor {
            code: Some(task.id.clone()),
            name: Some(task.title.clone()),
            url: Some(format!("{base}/{}", task.id)),
            full_score: Some(task.tests.iter().map(|t| t.value).sum()),
            ..ProblemDescriptor::new(task.id.clone())
        })
        .collect();
    ProblemDescriptor::sort_by_score_then_name(&mut problems);
    problems
}

/// Link to the submissions page of `handle`, for `/round/` contests.
#[must_use]
pub fn submissions_url(contest_url: &str, handle: &str) -> Option<String> {
    contest_url.contains("/round/").then(|| {
        let base = contest_url.replace("/round/", "/submissions/");
        let encoded = codec::encode(handle);
        format!("{}/{}", base.trim_end_matches('/'), encoded.trim_end_matches('='))
    })
}

/// Builds a row; rows without task results yield `None`.
#[must_use]
pub fn build_row(score: &UserScore, problems: &[ProblemDescriptor], contest_url: &str) -> Option<ParticipantRow> {
    if score.task_info.is_empty() {
        return None;
    }
    let mut row = ParticipantRow::new(score.displayname.clone(), Place::Rank(score.rank));
    row.solving = score.score_1;
    row.penalty = Some(format_micros_penalty(-score.score_2 as i64));
    row.country = score.country.clone().filter(|c| !c.is_empty());
    if let Some(url) = submissions_url(contest_url, &score.displayname) {
        row.set_extra("url", url);
    }

    for info in &score.task_info {
        let full_score = problems
            .iter()
            .find(|p| p.short == info.task_id)
            .and_then(|p| p.full_score);
        let partial = info.score != 0.0 && full_score.is_some_and(|f| (f - info.score).abs() > 1e-9);
        row.problems.insert(
            info.task_id.clone(),
            ProblemResult {
                result: Some(ScoreValue::Number(info.score)),
                time: (info.penalty_micros > 0.0).then(|| format_micros_penalty(info.penalty_micros as i64)),
                partial,
                penalty: (info.penalty_attempts > 0).then_some(info.penalty_attempts),
                ..ProblemResult::default()
            },
        );
    }
    row.recount_solved();
    Some(row)
}

/// Fills subscores, solution, language and time from the attempt whose
/// accepted test sets add up to the row's score of the task.
pub fn apply_attempts(row: &mut ParticipantRow, payload: &AttemptsPayload) {
    let mut attempts: Vec<&Attempt> = payload.attempts.iter().collect();
    attempts.sort_by_key(|a| a.timestamp_ms);

    for attempt in attempts {
        let Some(task) = payload.challenge.tasks.iter().find(|t| t.id == attempt.task_id) else {
            continue;
        };
        let mut subscores = Vec::new();
        let mut score = 0.0;
        for (result, test) in attempt.judgement.results.iter().zip(&task.tests) {
            if test.value == 0.0 {
                continue;
            }
            let accepted = result.verdict == Some(1);
            subscores.push(Subscore {
                status: test.value,
                result: result.verdict.map(|_| accepted),
                verdict: result
                    .verdict
                    .and(result.verdict_text.clone())
                    .or_else(|| result.status_text.clone())
                    .unwrap_or_default(),
            });
            if accepted {
                score += test.value;
            }
        }

        let problem = row.problems.entry(attempt.task_id.clone()).or_default();
        let current = problem.result.as_ref().and_then(ScoreValue::as_f64);
        if current.map_or(true, |c| (c - score).abs() > 1e-9) {
            continue;
        }
        problem.subscores = subscores;
        problem.solution = Some(attempt.src_content.replace('\0', ""));
        if let Some(language) = attempt.language.as_ref().filter(|l| !l.is_empty()) {
            problem.language = Some(language.clone());
        }
        if problem.time.is_none() {
            problem.time = Some(format_time((attempt.timestamp_ms - payload.challenge.start_ms) / 1000));
        }
    }
    row.enriched = true;
}

/// Advancement rule of Code Jam rounds 1 to 3 since 2020.
#[must_use]
pub fn advancement(descriptor: &ContestDescriptor) -> Option<Advancement> {
    if descriptor.start_time.year() < 2020 {
        return None;
    }
    let round = CODE_JAM_ROUND_RE.captures(&descriptor.name)?.get(1)?.as_str();
    let (title, threshold) = match round {
        "1" => ("The top 1500 contestants in this round will advance to Round 2", 1500),
        "2" => ("The top 1000 contestants in this round will win a T-shirt and advance to Round 3", 1000),
        _ => ("The top 25 contestants in this round will advance to the World Finals", 25),
    };
    Some(Advancement {
        title: title.to_string(),
        filter: vec![AdvanceFilter {
            field: "place".to_string(),
            operator: "le".to_string(),
            threshold,
        }],
    })
}

async fn fetch_page(session: &Session, base_url: &str, min_rank: usize, count: usize) -> Result<ScoreboardPage> {
    let url = format!("{base_url}{}", codec::encode(&scoreboard_query(min_rank, count)));
    codec::decode(&session.get_once(&url).await?, &url)
}

/// Fetches the scoreboard of a poll API contest into `document`.
pub async fn fetch(
    session: &Session,
    config: &StandingsConfig,
    descriptor: &ContestDescriptor,
    users: Option<&HashSet<String>>,
    statistics: Option<&Statistics>,
    document: &mut StandingsDocument,
    tracker: &mut PhaseTracker,
) -> Result<()> {
    let contest_url = descriptor.url.as_str();
    let id = contest_id(contest_url)?;
    let scoreboard_url = config.google.scoreboard_url.replace("{id}", id);
    let attempts_url = config.google.attempts_url.replace("{id}", id);
    let page_size = config.google.page_size.max(1);

    tracker.advance(FetchPhase::Listing);
    let first_url = format!("{scoreboard_url}{}", codec::encode(&scoreboard_query(1, page_size)));
    let first: ScoreboardPage = codec::decode(&session.get(&first_url).await?, &first_url)?;
    let challenge = first.challenge.clone().unwrap_or_default();
    let problems = problems_of(&challenge, contest_url);
    document.url = Some(contest_url.to_string());

    let pages = page_count(first.full_scoreboard_size, page_size);
    let engine = FetchEngine::new("google pages", config.phases.page_workers).with_retry(session.retry().clone());
    let rest: Vec<usize> = (1..pages).collect();
    let scoreboard_base = scoreboard_url.as_str();
    let outcomes = engine
        .run(rest, |page| fetch_page(session, scoreboard_base, page * page_size + 1, page_size))
        .await;

    let mut pages_data = vec![first];
    for outcome in outcomes {
        match outcome {
            UnitOutcome::Completed { value, .. } => pages_data.push(value),
            UnitOutcome::Failed { error, .. } => return Err(error),
            UnitOutcome::Skipped { .. } => {}
        }
    }

    let mut pending = Vec::new();
    for score in pages_data.iter().flat_map(|p| &p.user_scores) {
        if !is_requested(users, &score.displayname) {
            continue;
        }
        let Some(mut row) = build_row(score, &problems, contest_url) else {
            continue;
        };
        let handle = row.member.clone();
        if let Some(cached) = statistics.and_then(|s| s.get(&handle)).filter(|r| r.enriched) {
            row.merge_cached(cached);
        } else {
            pending.push(handle.clone());
        }
        document.result.insert(handle, row);
    }
    document.problems = ProblemSet::List(problems);

    if challenge.are_results_final && !pending.is_empty() {
        tracker.advance(FetchPhase::Enriching);
        fetch_attempts(session, config, &attempts_url, pending, statistics, document).await;
    }
    if let Some(advance) = advancement(descriptor) {
        document.info_fields.push("advance".to_string());
        document.advance = Some(advance);
    }
    Ok(())
}

async fn fetch_attempts(
    session: &Session,
    config: &StandingsConfig,
    attempts_url: &str,
    handles: Vec<String>,
    statistics: Option<&Statistics>,
    document: &mut StandingsDocument,
) {
    let engine =
        FetchEngine::new("google attempts", config.phases.page_workers).with_retry(session.retry().clone());
    let handle = engine.handle();
    let stopper = &handle;
    let outcomes = engine
        .run(handles, |nickname: String| async move {
            let url = format!("{attempts_url}{}", codec::encode(&attempts_query(&nickname)));
            let payload: AttemptsPayload = codec::decode(&session.get_once(&url).await?, &url)?;
            if !payload.challenge.are_results_final {
                tracing::info!(nickname = %nickname, "Attempts no longer final, stopping");
                stopper.stop();
                return Ok(None);
            }
            Ok::<_, StandingsError>(Some(payload))
        })
        .await;

    let mut merged: BTreeMap<String, AttemptsPayload> = BTreeMap::new();
    for outcome in outcomes {
        if let UnitOutcome::Completed { item, value: Some(payload) } = outcome {
            merged.insert(item, payload);
        }
    }
    for (nickname, payload) in merged {
        if is_cached_enriched(statistics, &nickname) {
            continue;
        }
        if let Some(row) = document.result.get_mut(&nickname) {
            apply_attempts(row, &payload);
        }
    }
    record_enrichment(document, "attempts", engine.progress());
}
