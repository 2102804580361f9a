//! Builders for descriptors and rows used across tests.

use chrono::{TimeZone, Utc};

use crate::models::{ContestDescriptor, ParticipantRow, ProblemResult, ScoreValue};

/// A Topcoder single round match with a known standings URL.
#[must_use]
pub fn srm_descriptor(round_id: u32) -> ContestDescriptor {
    let start = Utc.with_ymd_and_hms(2019, 3, 6, 11, 0, 0).single().unwrap_or_default();
    ContestDescriptor::new("SRM 752", "https://www.topcoder.com/tc?module=MatchDetails&rd=17427", start)
        .with_standings_url(format!("https://community.topcoder.com/stat?c=round_overview&rd={round_id}"))
        .with_key(round_id.to_string())
        .with_resource("topcoder.com")
}

/// A Topcoder marathon match backed by the challenge statistics API.
#[must_use]
pub fn marathon_descriptor(challenge_id: &str) -> ContestDescriptor {
    let start = Utc.with_ymd_and_hms(2021, 5, 12, 16, 0, 0).single().unwrap_or_default();
    ContestDescriptor::new(
        "Marathon Match 125",
        format!("https://www.topcoder.com/challenges/{challenge_id}"),
        start,
    )
    .with_key(challenge_id)
    .with_resource("topcoder.com")
}

/// A Google coding competitions round.
#[must_use]
pub fn google_round_descriptor(name: &str, contest_id: &str) -> ContestDescriptor {
    let start = Utc.with_ymd_and_hms(2021, 4, 10, 1, 0, 0).single().unwrap_or_default();
    ContestDescriptor::new(
        name,
        format!("https://codingcompetitions.withgoogle.com/codejam/round/{contest_id}"),
        start,
    )
    .with_key(contest_id)
    .with_resource("codingcompetitions.withgoogle.com")
}

/// A row with numeric results for problems named `A`, `B`, ...
#[must_use]
pub fn row_with_results(member: &str, place: u32, results: &[f64]) -> ParticipantRow {
    let mut row = ParticipantRow::new(member, place);
    for (short, result) in ('A'..='Z').zip(results) {
        row.problems.insert(
            short.to_string(),
            ProblemResult {
                result: Some(ScoreValue::Number(*result)),
                ..Default::default()
            },
        );
    }
    row.solving = results.iter().filter(|r| **r > 0.0).sum();
    row.recount_solved();
    row
}
