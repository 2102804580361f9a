//! Marathon matches served by the challenge statistics API.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

use crate::adapter::is_requested;
use crate::errors::{parse_json, Result};
use crate::models::{
    ParticipantRow, Place, ProblemDescriptor, ProblemResult, ProblemSet, ScoreValue, StandingsDocument,
};
use crate::normalize::round2;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entry {
    member: String,
    #[serde(default)]
    final_rank: Option<Value>,
    #[serde(default)]
    provisional_rank: Option<i64>,
    #[serde(default)]
    submissions: Vec<Submission>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Submission {
    #[serde(default)]
    final_score: Option<Value>,
    #[serde(default)]
    provisional_score: Option<Value>,
    #[serde(default)]
    created: Option<String>,
}

fn score(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Builds the standings document from the statistics payload.
///
/// The match is modelled as a single problem keyed by `challenge_id`. Rows
/// without a final rank or without a scored submission are skipped.
pub fn parse_statistics(
    payload: &str,
    challenge_id: &str,
    contest_name: &str,
    users: Option<&HashSet<String>>,
) -> Result<StandingsDocument> {
    let entries: Vec<Entry> = parse_json(payload, &format!("marathon statistics {challenge_id}"))?;

    let mut document = StandingsDocument::new(None);
    document.hide_field("time");
    document.hide_field("submits");
    document.set_field_type("delta_rank", "delta");
    document.set_field_type("delta_score", "delta");
    document.problems = ProblemSet::List(vec![ProblemDescriptor {
        name: Some(contest_name.to_string()),
        ..ProblemDescriptor::new(challenge_id)
    }]);

    for entry in entries {
        let Some(place) = entry.final_rank.as_ref().and_then(Place::from_value) else {
            continue;
        };
        if !is_requested(users, &entry.member) {
            continue;
        }
        let Some((submission, final_score)) = entry
            .submissions
            .iter()
            .find_map(|s| score(s.final_score.as_ref()).filter(|f| *f != 0.0).map(|f| (s, f)))
        else {
            continue;
        };

        let mut row = ParticipantRow::new(entry.member.clone(), place.clone());
        row.solving = final_score;
        row.problems.insert(
            challenge_id.to_string(),
            ProblemResult {
                result: Some(ScoreValue::Number(final_score)),
                ..Default::default()
            },
        );
        if let Some(provisional) = entry.provisional_rank {
            row.set_extra("provisional_rank", provisional);
            if let Some(rank) = place.rank() {
                row.set_extra("delta_rank", provisional - i64::from(rank));
            }
        }
        if let Some(provisional) = score(submission.provisional_score.as_ref()).filter(|p| *p > 0.0) {
            row.set_extra("provisional_score", round2(provisional));
            row.set_extra("delta_score", round2(final_score - provisional));
        }
        if let Some(created) = &submission.created {
            row.set_extra("time", created.clone());
        }
        row.set_extra("submits", entry.submissions.len());
        row.recount_solved();
        document.result.insert(entry.member, row);
    }
    Ok(document)
}
