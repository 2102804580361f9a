//! Single round matches: round overview, division results, coder details.

use regex::Regex;
use scraper::{ElementRef, Html, Node};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use super::basic_data::{self, Record};
use crate::adapter::{
    is_cached_enriched, is_requested, join_url, record_enrichment, FetchPhase, PhaseTracker, Session,
};
use crate::config::StandingsConfig;
use crate::engine::{FetchEngine, UnitOutcome};
use crate::errors::{Result, StandingsError};
use crate::models::{
    ParticipantRow, Place, ProblemDescriptor, ProblemResult, ProblemSet, ScoreValue, StandingsDocument, Statistics,
};
use crate::normalize::{coerce_number, dict_as_number, unescape_html};
use crate::retry::with_retry;
use crate::table::{selector, ParsedTable};

static ROUND_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"rd=([0-9]+)").expect("valid regex"));

static ROOM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:&nbsp;|\x{a0})Room\s*([0-9]+)").expect("valid regex"));

static ZERO_TIME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0.:]+$").expect("valid regex"));

const RATING_FIELDS: [&str; 3] = ["new_rating", "old_rating", "rating_change"];
const HIDDEN_FIELDS: [&str; 5] = ["coding_phase", "challenge_phase", "system_test", "point_total", "room"];
const NEGATED_STATUSES: [&str; 2] = ["Challenge Succeeded", "Failed System Test"];

/// Links found on a round overview page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundOverview {
    /// Division result page links, in division order.
    pub result_urls: Vec<String>,
    /// Problem statements per division table.
    pub problem_sets: Vec<Vec<ProblemDescriptor>>,
}

/// Details of one problem statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProblemDetail {
    /// Lowercased categories.
    pub tags: Vec<String>,
    /// Problem writers.
    pub writers: Vec<String>,
    /// Problem testers.
    pub testers: Vec<String>,
}

/// One challenge made by a coder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Challenge {
    /// Challenged handle.
    pub target: String,
    /// Problem short name.
    pub problem: String,
    /// `Yes` when the challenge succeeded.
    pub status: String,
    /// Challenge time.
    pub time: String,
    /// Points gained or lost.
    pub result: f64,
    /// Details link.
    pub url: String,
}

/// A coder's room page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoderDetail {
    /// Handle shown on the page.
    pub handle: String,
    /// Room number.
    pub room: Option<String>,
    /// Results by problem short name.
    pub problems: BTreeMap<String, ProblemResult>,
    /// Challenges made.
    pub challenges: Vec<Challenge>,
}

/// A division results row with the link to its coder page.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsRow {
    /// Normalized row.
    pub row: ParticipantRow,
    /// Coder detail page.
    pub detail_url: Option<String>,
}

fn cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "td")
        .collect()
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    crate::table::collapse_whitespace(&cell.text().collect::<String>())
}

/// Parses division result links and problem statement links of a round
/// overview page. Fails when no result link is present.
pub fn parse_round_overview(html: &str, base_url: &str) -> Result<RoundOverview> {
    let document = Html::parse_document(html);
    let links = selector("a[href]")?;

    let mut overview = RoundOverview::default();
    let mut tables: Vec<(Option<ElementRef<'_>>, Vec<ProblemDescriptor>)> = Vec::new();
    for link in document.select(&links) {
        let href = link.value().attr("href").unwrap_or_default();
        let text = cell_text(&link);
        if text.eq_ignore_ascii_case("results") {
            overview.result_urls.push(href.replace("&amp;", "&"));
        } else if href.to_ascii_lowercase().contains("c=problem_statement") && !text.contains('/') {
            let problem = ProblemDescriptor {
                url: Some(join_url(base_url, href)),
                ..ProblemDescriptor::new(text)
            };
            let table = link
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|e| e.value().name() == "table");
            match tables.iter_mut().find(|(t, _)| *t == table) {
                Some((_, set)) => set.push(problem),
                None => tables.push((table, vec![problem])),
            }
        }
    }
    if overview.result_urls.is_empty() {
        return Err(StandingsError::parse(base_url, "no division result links"));
    }
    overview.problem_sets = tables.into_iter().map(|(_, set)| set).collect();
    Ok(overview)
}

/// Finds the problem detail link on a statement page.
pub fn parse_problem_detail_link(html: &str) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let links = selector("a[href]")?;
    Ok(document
        .select(&links)
        .filter_map(|a| a.value().attr("href"))
        .find(|h| h.contains("module=ProblemDetail"))
        .map(str::to_string))
}

/// Parses categories, writers and testers from a problem detail page.
pub fn parse_problem_detail(html: &str) -> Result<ProblemDetail> {
    let document = Html::parse_document(html);
    let keys = selector("td.statTextBig")?;

    let mut detail = ProblemDetail::default();
    for key_cell in document.select(&keys) {
        let Some(value) = key_cell.next_siblings().find_map(ElementRef::wrap) else {
            continue;
        };
        let key = cell_text(&key_cell).trim_end_matches(':').to_lowercase();
        let names = || -> Vec<String> {
            value
                .text()
                .flat_map(|t| t.split(','))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };
        if key == "categories" {
            detail.tags = cell_text(&value)
                .split(',')
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
        } else if key.starts_with("writer") {
            detail.writers = names();
        } else if key.starts_with("tester") {
            detail.testers = names();
        }
    }
    Ok(detail)
}

/// Parses a division results table.
///
/// Rows are `tr[valign=middle]` with at least ten cells, the first being the
/// header. `division` is the division number.
pub fn parse_results_table(
    html: &str,
    base_url: &str,
    division: usize,
    users: Option<&HashSet<String>>,
) -> Result<Vec<ResultsRow>> {
    let table = ParsedTable::from_rows(html, r#"tr[valign="middle"]"#, 10)?;
    let mut rows = Vec::new();

    for index in 0..table.len() {
        let mut handle = None;
        let mut detail_url = None;
        let mut pairs = Vec::new();
        for (key, cell) in table.record(index) {
            if key == "Coders" {
                handle = Some(cell.value.trim().to_string());
                detail_url = cell.link().map(|href| join_url(base_url, href));
            } else {
                pairs.push((key, cell.value.as_str()));
            }
        }
        let Some(handle) = handle.filter(|h| !h.is_empty()) else {
            continue;
        };
        if !is_requested(users, &handle) {
            continue;
        }

        let mut fields = dict_as_number(pairs);
        if RATING_FIELDS.iter().all(|f| fields.get(*f).map_or(true, is_blank)) {
            for field in RATING_FIELDS {
                fields.remove(field);
            }
        }
        let place = fields
            .remove("division_placed")
            .and_then(|v| Place::from_value(&v))
            .unwrap_or_else(|| Place::Label("-".to_string()));

        let mut row = ParticipantRow::new(handle, place);
        row.solving = fields.get("point_total").and_then(Value::as_f64).unwrap_or(0.0);
        if let Some(advanced) = fields.remove("adv.") {
            let yes = advanced.as_str().is_some_and(|s| s.to_lowercase().starts_with('y'));
            row.set_extra("advanced", yes);
        }
        row.merge_fields(fields);
        row.set_extra("division", "I".repeat(division));
        rows.push(ResultsRow { row, detail_url });
    }
    Ok(rows)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

/// Parses a coder's room page: handle, room, problem rows and challenges.
pub fn parse_coder_detail(html: &str, base_url: &str) -> Result<CoderDetail> {
    let document = Html::parse_document(html);
    let handle_link = selector(".coderBrackets a")?;
    let rows = selector("tr")?;
    let solution_link = selector(r#"a[href*="c=problem_solution"]"#)?;
    let profile_link = selector(r#"a[href*="module=MemberProfile"]"#)?;
    let any_link = selector("a[href]")?;

    let handle = document
        .select(&handle_link)
        .next()
        .map(|a| unescape_html(cell_text(&a).trim()))
        .filter(|h| !h.is_empty())
        .ok_or_else(|| StandingsError::parse(base_url, "coder handle not found"))?;

    let room = ROOM_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    let mut detail = CoderDetail {
        handle,
        room,
        ..CoderDetail::default()
    };

    for row in document.select(&rows) {
        let cells = cells(row);
        if cells.len() < 6 {
            continue;
        }
        if let Some(link) = cells[0].select(&solution_link).next() {
            let short = cell_text(&link);
            let href = link.value().attr("href").unwrap_or_default();
            detail.problems.insert(short, problem_row(&cells, join_url(base_url, href)));
        } else if cells[0].select(&profile_link).next().is_some() {
            let Some(details) = cells[5]
                .select(&any_link)
                .find(|a| cell_text(a).eq_ignore_ascii_case("details"))
            else {
                continue;
            };
            let Ok(result) = cell_text(&cells[4]).replace(',', ".").parse::<f64>() else {
                continue;
            };
            detail.challenges.push(Challenge {
                target: cell_text(&cells[0]),
                problem: cell_text(&cells[1]),
                status: cell_text(&cells[2]),
                time: cell_text(&cells[3]),
                result,
                url: join_url(base_url, details.value().attr("href").unwrap_or_default()),
            });
        }
    }

    for challenge in &detail.challenges {
        let problem = detail.problems.entry(challenge.problem.clone()).or_default();
        *problem.extra_score.get_or_insert(0.0) += challenge.result;
        problem.extra_info.push(format!("{}: {}", challenge.target, challenge.result));
    }
    Ok(detail)
}

fn problem_row(cells: &[ElementRef<'_>], url: String) -> ProblemResult {
    let time = cell_text(&cells[3]);
    let status = cell_text(&cells[4]);
    let mut result = coerce_number(&cell_text(&cells[5])).and_then(|v| v.as_f64());
    if NEGATED_STATUSES.contains(&status.as_str()) {
        result = result.map(|r| -r);
    }
    ProblemResult {
        result: result.filter(|r| r.abs() >= 1e-9).map(ScoreValue::Number),
        time: (!time.is_empty() && !ZERO_TIME_RE.is_match(&time)).then_some(time),
        status: (!status.is_empty()).then_some(status),
        url: Some(url),
        ..ProblemResult::default()
    }
}

/// Extracts the source text of a solution page.
pub fn parse_solution(html: &str) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let text_cell = selector("td.problemText")?;
    Ok(document.select(&text_cell).next().map(|cell| {
        let mut out = String::new();
        for node in cell.descendants() {
            match node.value() {
                Node::Text(text) => out.push_str(text),
                Node::Element(e) if e.name() == "br" => out.push('\n'),
                _ => {}
            }
        }
        out.replace('\u{a0}', " ").trim().to_string()
    }))
}

fn division_of(url: &str) -> usize {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.query_pairs().find(|(k, _)| k == "dn").and_then(|(_, v)| v.parse().ok()))
        .unwrap_or(1)
}

fn cached_solution<'a>(statistics: Option<&'a Statistics>, handle: &str, short: &str) -> Option<&'a str> {
    statistics?
        .get(handle)?
        .problems
        .get(short)?
        .solution
        .as_deref()
        .filter(|s| !s.is_empty())
}

async fn fetch_problem(session: &Session, mut problem: ProblemDescriptor) -> Result<ProblemDescriptor> {
    let Some(statement_url) = problem.url.clone() else {
        return Ok(problem);
    };
    let statement = session.get_once(&statement_url).await?;
    let link = parse_problem_detail_link(&statement)?
        .ok_or_else(|| StandingsError::parse(&statement_url, "problem detail link not found"))?;
    let detail = parse_problem_detail(&session.get_once(&join_url(&statement_url, &link)).await?)?;
    problem.tags = detail.tags;
    problem.writers = detail.writers;
    problem.testers = detail.testers;
    Ok(problem)
}

async fn fetch_solution(session: &Session, url: &str) -> Option<String> {
    let policy = session.retry_with_attempts(2);
    match with_retry(&policy, url, || session.get_once(url)).await {
        Ok(page) => parse_solution(&page).ok().flatten(),
        Err(e) => {
            tracing::debug!(url, error = %e, "Solution unavailable");
            None
        }
    }
}

async fn fetch_coder(session: &Session, url: &str, statistics: Option<&Statistics>) -> Result<CoderDetail> {
    let page = session.get_once(url).await?;
    let mut detail = parse_coder_detail(&page, url)?;
    for (short, problem) in &mut detail.problems {
        let Some(solution_url) = problem.url.clone() else {
            continue;
        };
        problem.solution = match cached_solution(statistics, &detail.handle, short) {
            Some(cached) => Some(cached.to_string()),
            None => fetch_solution(session, &solution_url).await,
        };
    }
    Ok(detail)
}

fn apply_coder_detail(row: &mut ParticipantRow, url: &str, detail: CoderDetail) {
    row.set_extra("url", url);
    if let Some(room) = detail.room {
        row.set_extra("room", room);
    }
    row.problems = detail.problems;
    if !detail.challenges.is_empty() {
        let successful = detail
            .challenges
            .iter()
            .filter(|c| c.status.eq_ignore_ascii_case("yes"))
            .count();
        row.set_extra(
            "hack",
            json!({
                "title": "challenges",
                "successful": successful,
                "unsuccessful": detail.challenges.len() - successful,
            }),
        );
    }
    row.set_extra("challenges", serde_json::to_value(&detail.challenges).unwrap_or(Value::Null));
    row.recount_solved();
    row.enriched = true;
}

/// Copies round results feed fields the rows do not have yet and hides them.
///
/// `new_vol` becomes `new_volatility`, `advanced` is ignored, and
/// `level_{one,two,three}_language` sets the language of the matching
/// problem of the row's division.
pub fn merge_round_results(document: &mut StandingsDocument, feed: &HashMap<String, Record>) {
    let mut known: HashSet<String> = ["member", "place", "solving", "solved", "penalty", "problems", "country"]
        .into_iter()
        .map(str::to_string)
        .collect();
    for row in document.result.values() {
        known.extend(row.extra.keys().cloned());
    }

    let mut hidden = Vec::new();
    for (handle, record) in feed {
        let Some(row) = document.result.get_mut(handle) else {
            continue;
        };
        for (key, value) in record {
            let key = match key.as_str() {
                "advanced" => continue,
                "new_vol" => "new_volatility",
                other => other,
            };
            if known.contains(key) {
                continue;
            }
            row.set_extra(key, value.clone());
            hidden.push(key.to_string());

            let parts: Vec<&str> = key.split('_').collect();
            if parts.len() == 3 && parts[0] == "level" && parts[2] == "language" && !value.eq_ignore_ascii_case("unspecified") {
                let index = match parts[1] {
                    "one" => 0,
                    "two" => 1,
                    "three" => 2,
                    _ => continue,
                };
                let division = row.extra("division").and_then(Value::as_str).unwrap_or("I");
                let short = document
                    .problems
                    .for_division(division)
                    .and_then(|set| set.get(index))
                    .map(|p| p.short.clone());
                if let Some(problem) = short.and_then(|s| row.problems.get_mut(&s)) {
                    problem.language = Some(value.clone());
                }
            }
        }
    }
    hidden.sort();
    for field in hidden {
        document.hide_field(field);
    }
}

/// Orders writers by the number of problems they wrote, keeping first
/// appearance order among ties.
#[must_use]
pub fn rank_writers(problems: &[ProblemDescriptor]) -> Vec<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for writer in problems.iter().flat_map(|p| &p.writers) {
        match counts.iter_mut().find(|(w, _)| w == writer) {
            Some((_, n)) => *n += 1,
            None => counts.push((writer.clone(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().map(|(w, _)| w).collect()
}

/// Fetches a single round match into `document`.
pub async fn fetch(
    session: &Session,
    config: &StandingsConfig,
    standings_url: &str,
    users: Option<&HashSet<String>>,
    statistics: Option<&Statistics>,
    document: &mut StandingsDocument,
    tracker: &mut PhaseTracker,
) -> Result<()> {
    let overview_url = format!("{standings_url}&nr=100000042");
    let overview = parse_round_overview(&session.get(&overview_url).await?, &overview_url)?;

    let round_feed = match ROUND_ID_RE.captures(&overview_url).and_then(|c| c.get(1)) {
        Some(rd) => {
            let url = config
                .topcoder
                .basic_data_url
                .replace("{query}", &format!("c=dd_round_results&rd={}", rd.as_str()));
            match session.get(&url).await.and_then(|xml| basic_data::parse_records(&xml)) {
                Ok(records) => basic_data::by_handle(records),
                Err(e) => {
                    tracing::debug!(url, error = %e, "Round results feed unavailable");
                    HashMap::new()
                }
            }
        }
        None => HashMap::new(),
    };

    for field in HIDDEN_FIELDS {
        document.hide_field(field);
    }

    let divided = overview.result_urls.len() > 1;
    let mut problem_sets = overview.problem_sets.into_iter();
    let mut divisions: BTreeMap<String, Vec<ProblemDescriptor>> = BTreeMap::new();

    for result_url in &overview.result_urls {
        let results_url = join_url(standings_url, &format!("{result_url}&em=1000000042"));
        let division = division_of(&results_url);
        let label = "I".repeat(division);

        let problems = fetch_problems(session, config, problem_sets.next().unwrap_or_default()).await;
        divisions.insert(label.clone(), problems);

        if users.is_some_and(HashSet::is_empty) {
            continue;
        }

        let page = session.get(&results_url).await?;
        let mut detail_urls = Vec::new();
        for ResultsRow { row, detail_url } in parse_results_table(&page, &results_url, division, users)? {
            let handle = row.member.clone();
            match document.result.get_mut(&handle) {
                Some(existing) => existing.merge_fields(row.extra),
                None => {
                    document.result.insert(handle.clone(), row);
                }
            }
            if let Some(cached) = statistics.and_then(|s| s.get(&handle)).filter(|r| r.enriched) {
                if let Some(existing) = document.result.get_mut(&handle) {
                    existing.merge_cached(cached);
                }
            } else if let Some(url) = detail_url {
                detail_urls.push(url);
            }
        }

        tracker.advance(FetchPhase::Enriching);
        fetch_details(session, config, &label, detail_urls, statistics, document).await;
    }

    let all_problems: Vec<ProblemDescriptor> = divisions.values().flatten().cloned().collect();
    document.problems = if divided {
        ProblemSet::Divisions { division: divisions }
    } else {
        ProblemSet::List(divisions.into_values().next().unwrap_or_default())
    };

    if !round_feed.is_empty() {
        merge_round_results(document, &round_feed);
    }
    document.writers = rank_writers(&all_problems);
    document.options.fixed_fields.push(("hack".to_string(), "Challenges".to_string()));
    Ok(())
}

async fn fetch_problems(
    session: &Session,
    config: &StandingsConfig,
    problems: Vec<ProblemDescriptor>,
) -> Vec<ProblemDescriptor> {
    let engine = FetchEngine::new("topcoder problems", config.phases.problem_workers)
        .with_retry(session.retry_with_attempts(3));
    let mut fetched: Vec<(usize, ProblemDescriptor)> = engine
        .run(problems.into_iter().enumerate().collect(), |(index, problem)| async move {
            Ok::<_, StandingsError>((index, fetch_problem(session, problem).await?))
        })
        .await
        .into_iter()
        .map(|outcome| match outcome {
            UnitOutcome::Completed { value, .. } => value,
            UnitOutcome::Failed { item, error } => {
                tracing::error!(problem = %item.1.short, error = %error, "Problem info unavailable");
                item
            }
            UnitOutcome::Skipped { item } => item,
        })
        .collect();
    fetched.sort_by_key(|(index, _)| *index);
    fetched.into_iter().map(|(_, p)| p).collect()
}

async fn fetch_details(
    session: &Session,
    config: &StandingsConfig,
    division: &str,
    urls: Vec<String>,
    statistics: Option<&Statistics>,
    document: &mut StandingsDocument,
) {
    if urls.is_empty() {
        return;
    }
    let engine = FetchEngine::new(format!("topcoder div{division} details"), config.phases.detail_workers)
        .with_retry(session.retry_with_attempts(3))
        .with_failure_threshold(config.phases.detail_failure_threshold);
    let outcomes = engine
        .run(urls, |url: String| async move { fetch_coder(session, &url, statistics).await })
        .await;

    for outcome in outcomes {
        let UnitOutcome::Completed { item: url, value: detail } = outcome else {
            continue;
        };
        if is_cached_enriched(statistics, &detail.handle) {
            continue;
        }
        match document.result.get_mut(&detail.handle) {
            Some(row) => apply_coder_detail(row, &url, detail),
            None => tracing::error!(handle = %detail.handle, url, "Coder page for unknown row"),
        }
    }
    record_enrichment(document, &format!("div{division} details"), engine.progress());
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use pretty_assertions::assert_eq;

    const BASE: &str = "https://community.topcoder.com/stat?c=round_overview&rd=17427";

    #[test]
    fn test_parse_round_overview() {
        let overview = parse_round_overview(ROUND_OVERVIEW, BASE).unwrap();
        assert_eq!(overview.result_urls.len(), 2);
        assert_eq!(overview.problem_sets.len(), 2);
        assert_eq!(overview.problem_sets[0].len(), 2);
        assert_eq!(overview.problem_sets[0][1].short, "HardOne");
        assert_eq!(
            overview.problem_sets[1][0].url.as_deref(),
            Some("https://community.topcoder.com/stat?c=problem_statement&pm=15002")
        );
    }

    #[test]
    fn test_round_overview_without_results_is_parse_error() {
        let err = parse_round_overview("<p>maintenance</p>", BASE).unwrap_err();
        assert!(matches!(err, StandingsError::Parse { .. }));
    }

    #[test]
    fn test_parse_problem_detail() {
        assert_eq!(
            parse_problem_detail_link(STATEMENT).unwrap().as_deref(),
            Some("/tc?module=ProblemDetail&rd=17427&pm=15000")
        );
        let detail = parse_problem_detail(PROBLEM_DETAIL).unwrap();
        assert_eq!(detail.tags, vec!["greedy", "math"]);
        assert_eq!(detail.writers, vec!["misof", "lg5293"]);
        assert_eq!(detail.testers, vec!["timmac"]);
    }

    #[test]
    fn test_parse_results_table() {
        let html = results_table(&[("tourist", "1", "1234,56", "Yes"), ("petr", "=2", "900,00", "N/A")]);
        let rows = parse_results_table(&html, BASE, 1, None).unwrap();
        assert_eq!(rows.len(), 2);

        let tourist = &rows[0].row;
        assert_eq!(tourist.place, Place::Rank(1));
        assert!((tourist.solving - 1234.56).abs() < 1e-9);
        assert_eq!(tourist.extra("advanced"), Some(&json!(true)));
        assert_eq!(tourist.extra("division"), Some(&json!("I")));
        assert!(tourist.extra("old_rating").is_none());
        assert!(tourist.extra("division_placed").is_none());
        assert_eq!(
            rows[0].detail_url.as_deref(),
            Some("https://community.topcoder.com/stat?c=coder_room_stats&cr=tourist")
        );

        let petr = &rows[1].row;
        assert_eq!(petr.place, Place::Rank(2));
        assert!(petr.extra("advanced").is_none());

        let users: HashSet<String> = ["petr".to_string()].into();
        let filtered = parse_results_table(&html, BASE, 2, Some(&users)).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].row.extra("division"), Some(&json!("II")));
    }

    #[test]
    fn test_parse_coder_detail() {
        let detail = parse_coder_detail(&coder_page("tourist"), BASE).unwrap();
        assert_eq!(detail.handle, "tourist");
        assert_eq!(detail.room.as_deref(), Some("7"));

        let easy = &detail.problems["EasyOne"];
        assert_eq!(easy.result, Some(ScoreValue::Number(243.51)));
        assert_eq!(easy.time.as_deref(), Some("5:21.345"));
        assert_eq!(easy.extra_score, Some(50.0));
        assert_eq!(easy.extra_info, vec!["victim: 50"]);

        let hard = &detail.problems["HardOne"];
        assert!(hard.result.is_none());
        assert!(hard.time.is_none());
        assert_eq!(hard.status.as_deref(), Some("Opened"));

        assert_eq!(detail.challenges.len(), 1);
        assert_eq!(detail.challenges[0].status, "Yes");
    }

    #[test]
    fn test_negated_statuses() {
        let page = coder_page("a").replace("Passed System Test", "Failed System Test");
        let detail = parse_coder_detail(&page, BASE).unwrap();
        assert_eq!(detail.problems["EasyOne"].result, Some(ScoreValue::Number(-243.51)));
    }

    #[test]
    fn test_coder_detail_without_handle() {
        assert!(parse_coder_detail("<html></html>", BASE).is_err());
    }

    #[test]
    fn test_parse_solution() {
        assert_eq!(
            parse_solution(SOLUTION).unwrap().as_deref(),
            Some("int main() {\n  return 0;\n}")
        );
        assert!(parse_solution("<p>none</p>").unwrap().is_none());
    }

    #[test]
    fn test_merge_round_results() {
        let mut doc = StandingsDocument::new(None);
        doc.problems = ProblemSet::List(vec![ProblemDescriptor::new("EasyOne")]);
        let mut row = ParticipantRow::new("tourist", Place::Rank(1));
        row.set_extra("division", "I");
        row.problems.insert("EasyOne".into(), ProblemResult::default());
        doc.result.insert("tourist".into(), row);

        let feed = basic_data::by_handle(basic_data::parse_records(ROUND_RESULTS_XML).unwrap());
        merge_round_results(&mut doc, &feed);

        let row = &doc.result["tourist"];
        assert_eq!(row.extra("new_volatility"), Some(&json!("300")));
        assert!(row.extra("advanced").is_none());
        assert_eq!(row.problems["EasyOne"].language.as_deref(), Some("C++"));
        assert_eq!(doc.hidden_fields, vec!["level_one_language", "new_volatility"]);
    }

    #[test]
    fn test_rank_writers() {
        let problem = |writers: &[&str]| ProblemDescriptor {
            writers: writers.iter().map(|w| (*w).to_string()).collect(),
            ..ProblemDescriptor::new("x")
        };
        let writers = rank_writers(&[problem(&["a", "b"]), problem(&["b"]), problem(&["c"])]);
        assert_eq!(writers, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_division_of() {
        assert_eq!(division_of("https://x/stat?c=round_stats_sorted&rd=1&dn=2&em=1000000042"), 2);
        assert_eq!(division_of("https://x/stat?c=round_stats_sorted"), 1);
    }
}
