//! Hash Code rounds: yearly archive data or a judge scoreboard page.

use chrono::Datelike;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use crate::adapter::{FetchPhase, PhaseTracker, Session};
use crate::config::StandingsConfig;
use crate::errors::{parse_json, Result, StandingsError};
use crate::models::{ContestDescriptor, ParticipantRow, Place, StandingsDocument};
use crate::normalize::{format_time_segments, split_flag_prefix, unescape_html};
use crate::table::ParsedTable;

static JUDGE_TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<table[^>]*class="[^"]*Hashcode[^"]*Judge[^"]*Table[^"]*"[^>]*>.*?</table>"#)
        .expect("valid regex")
});

const FINAL_ROUND_ALIASES: [&str; 2] = ["Full ranking", "Main round"];

/// One scoreboard record: column name to value.
pub type Record = Map<String, Value>;

/// Picks the data of the round named like the contest.
///
/// A repeated round name stands for the qualification round; the final
/// round may be published as "Full ranking" or "Main round".
#[must_use]
pub fn select_archive_round(archive: &Value, contest_name: &str) -> Option<Value> {
    let is_final_round = contest_name.ends_with("Final Round");
    let mut seen = HashSet::new();
    for round in archive.get("rounds")?.as_array()? {
        let Some(mut name) = round.get("name").and_then(Value::as_str) else {
            continue;
        };
        if seen.contains(name) {
            name = "Qualification Round";
        }
        if contest_name.ends_with(name) || (is_final_round && FINAL_ROUND_ALIASES.contains(&name)) {
            return round.get("data").cloned();
        }
        seen.insert(name);
    }
    None
}

/// Reads the judge scoreboard table of a page, if it has one.
pub fn parse_judge_table(page: &str) -> Result<Option<Vec<Record>>> {
    let Some(table) = JUDGE_TABLE_RE.find(page) else {
        return Ok(None);
    };
    let table = ParsedTable::parse(table.as_str())?;
    Ok(Some(
        (0..table.len())
            .map(|i| {
                table
                    .record(i)
                    .map(|(k, cell)| (k.to_string(), Value::String(cell.value.clone())))
                    .collect()
            })
            .collect(),
    ))
}

/// Flattens scoreboard data: `{columns, rows}` tables or a list of objects.
pub fn records_of(data: &Value, context: &str) -> Result<Vec<Record>> {
    if let Some(columns) = data.get("columns").and_then(Value::as_array) {
        let names: Vec<String> = columns.iter().map(|c| c.as_str().unwrap_or_default().to_string()).collect();
        let rows = data.get("rows").and_then(Value::as_array).map_or(&[][..], Vec::as_slice);
        return Ok(rows
            .iter()
            .filter_map(Value::as_array)
            .map(|row| names.iter().cloned().zip(row.iter().cloned()).collect())
            .collect());
    }
    data.as_array()
        .map(|rows| rows.iter().filter_map(Value::as_object).cloned().collect())
        .ok_or_else(|| StandingsError::parse(context, "unrecognised scoreboard data"))
}

fn normalize_keys(record: &Record) -> Record {
    record
        .iter()
        .map(|(k, v)| (k.to_lowercase().replace(' ', ""), v.clone()))
        .collect()
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn score_of(value: Option<&Value>) -> f64 {
    value
        .map(text_of)
        .map(|s| s.chars().filter(|c| !c.is_whitespace() && *c != ',').collect::<String>())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0)
}

fn countries_of(record: &mut Record, name: &mut String) -> Vec<String> {
    if let Some(country) = record.remove("country") {
        return text_of(&country)
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(Value::Array(countries)) = record.remove("countries") {
        return countries.iter().map(text_of).collect();
    }
    let (codes, rest) = split_flag_prefix(name);
    if !codes.is_empty() {
        *name = rest;
    }
    codes
}

/// Builds rows keyed by `"<team>, <season>"`. `users` filters team names.
#[must_use]
pub fn build_rows(
    records: &[Record],
    descriptor: &ContestDescriptor,
    users: Option<&HashSet<String>>,
) -> BTreeMap<String, ParticipantRow> {
    let season = descriptor.season();
    let start = descriptor.start_time.timestamp();
    let mut rows = BTreeMap::new();

    for (index, record) in records.iter().enumerate() {
        let mut record = normalize_keys(record);
        let Some(team) = record.remove("teamname") else {
            continue;
        };
        let mut name = unescape_html(text_of(&team).trim());
        let countries = countries_of(&mut record, &mut name);
        if users.is_some_and(|u| !u.contains(&name)) {
            continue;
        }

        let member = format!("{name}, {season}");
        let place = record
            .remove("rank")
            .and_then(|r| Place::from_value(&r))
            .unwrap_or_else(|| Place::Rank(u32::try_from(index + 1).unwrap_or(u32::MAX)));
        let mut row = ParticipantRow::new(member.clone(), place);
        row.solving = score_of(record.get("score"));
        row.set_extra("name", name);
        row.country = countries.first().cloned();
        if countries.len() > 1 {
            row.set_extra("countries", countries);
        }
        if let Some(advanced) = record.get("finalround") {
            row.set_extra("advanced", advanced.clone());
        }
        if let Some(millis) = record
            .get("submissiontime")
            .and_then(|t| t.get("iMillis"))
            .and_then(Value::as_i64)
        {
            row.set_extra("time", format_time_segments(millis / 1000 - start, 3));
        }
        if let Some(hub) = record.remove("hubid") {
            row.set_extra("hub_id", hub);
        }
        rows.insert(member, row);
    }
    rows
}

/// Fetches a Hash Code round into `document`.
pub async fn fetch(
    session: &Session,
    config: &StandingsConfig,
    descriptor: &ContestDescriptor,
    users: Option<&HashSet<String>>,
    document: &mut StandingsDocument,
    tracker: &mut PhaseTracker,
) -> Result<()> {
    tracker.advance(FetchPhase::Listing);
    let year = descriptor.start_time.year().to_string();
    let data_url = config.google.archive_data_url.replace("{year}", &year);

    let mut records = match session.get(&data_url).await {
        Ok(text) => {
            let archive: Value = parse_json(&text, &data_url)?;
            match select_archive_round(&archive, &descriptor.name) {
                Some(data) => {
                    document.url = Some(config.google.archive_url.replace("{year}", &year));
                    Some(records_of(&data, &data_url)?)
                }
                None => None,
            }
        }
        Err(StandingsError::Fetch(e)) if e.status_code() == Some(404) => {
            tracing::debug!(url = %data_url, "No Hash Code archive for the year");
            None
        }
        Err(e) => return Err(e),
    };

    if records.is_none() {
        let Some(scoreboard) = descriptor.info_str("hashcode_scoreboard") else {
            return Err(StandingsError::StandingsUnavailable(format!(
                "no Hash Code data for {}",
                descriptor.name
            )));
        };
        let page = session.get(scoreboard).await?;
        records = Some(match parse_judge_table(&page)? {
            Some(records) => records,
            None => records_of(&parse_json(&page, scoreboard)?, scoreboard)?,
        });
    }

    document.result = build_rows(&records.unwrap_or_default(), descriptor, users);
    document.hide_field("hub_id");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn descriptor(name: &str) -> ContestDescriptor {
        ContestDescriptor::new(
            name,
            "https://codingcompetitions.withgoogle.com/hashcode/round/00000000008caae7",
            Utc.with_ymd_and_hms(2021, 2, 25, 17, 30, 0).unwrap(),
        )
    }

    fn archive() -> Value {
        json!({"rounds": [
            {"name": "Online Qualification Round", "data": [{"Team name": "first"}]},
            {"name": "Online Qualification Round", "data": [{"Team name": "second"}]},
            {"name": "Full ranking", "data": {"columns": ["Team name", "Score", "Country"], "rows": [["alpha &amp; beta", "8,926,023", "Poland, Russia"]]}}
        ]})
    }

    #[test]
    fn test_select_archive_round() {
        let qualification = select_archive_round(&archive(), "Hash Code 2021. Qualification Round").unwrap();
        assert_eq!(qualification[0]["Team name"], "second");

        let first = select_archive_round(&archive(), "Hash Code 2021. Online Qualification Round").unwrap();
        assert_eq!(first[0]["Team name"], "first");

        let finals = select_archive_round(&archive(), "Hash Code 2021. Final Round").unwrap();
        assert!(finals.get("columns").is_some());

        assert!(select_archive_round(&archive(), "Hash Code 2021. Semifinal").is_none());
    }

    #[test]
    fn test_columnar_records() {
        let finals = select_archive_round(&archive(), "Hash Code 2021. Final Round").unwrap();
        let records = records_of(&finals, "test").unwrap();
        let rows = build_rows(&records, &descriptor("Hash Code 2021. Final Round"), None);

        let row = &rows["alpha & beta, 2020-2021"];
        assert_eq!(row.place, Place::Rank(1));
        assert!((row.solving - 8_926_023.0).abs() < f64::EPSILON);
        assert_eq!(row.country.as_deref(), Some("Poland"));
        assert_eq!(row.extra("countries"), Some(&json!(["Poland", "Russia"])));
        assert_eq!(row.extra("name"), Some(&json!("alpha & beta")));
    }

    #[test]
    fn test_flag_prefixed_team_names() {
        let records = records_of(
            &json!([
                {"Team Name": "\u{1F1F5}\u{1F1F1} \u{1F1FA}\u{1F1E6} Pierogi", "Score": 10, "Rank": 4, "Hub ID": 7,
                 "submissionTime": {"iMillis": 1_614_275_000_000_i64}},
                {"Team Name": "Plain", "Score": "n/a"}
            ]),
            "test",
        )
        .unwrap();
        let rows = build_rows(&records, &descriptor("Hash Code 2021. Qualification Round"), None);

        let pierogi = &rows["Pierogi, 2020-2021"];
        assert_eq!(pierogi.place, Place::Rank(4));
        assert_eq!(pierogi.country.as_deref(), Some("PL"));
        assert_eq!(pierogi.extra("countries"), Some(&json!(["PL", "UA"])));
        assert_eq!(pierogi.extra("hub_id"), Some(&json!(7)));
        assert_eq!(pierogi.extra("time"), Some(&json!("0:13:20")));

        let plain = &rows["Plain, 2020-2021"];
        assert_eq!(plain.place, Place::Rank(2));
        assert!(plain.solving.abs() < f64::EPSILON);
        assert!(plain.country.is_none());

        let users: HashSet<String> = ["Plain".to_string()].into();
        let filtered = build_rows(&records, &descriptor("Hash Code 2021. Qualification Round"), Some(&users));
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_parse_judge_table() {
        let page = r#"<div><table class="mat-table HashcodeJudgeTable">
            <tr><th>Rank</th><th>Team name</th><th>Score</th></tr>
            <tr><td>1</td><td>Ants</td><td>1 000</td></tr>
        </table></div>"#;
        let records = parse_judge_table(page).unwrap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["Team name"], "Ants");
        let rows = build_rows(&records, &descriptor("Hash Code 2021. Final Round"), None);
        assert!((rows["Ants, 2020-2021"].solving - 1000.0).abs() < f64::EPSILON);

        assert!(parse_judge_table("<p>json instead</p>").unwrap().is_none());
    }
}
