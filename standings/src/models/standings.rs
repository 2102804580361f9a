//! Standings document, participant rows and problem descriptors.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::normalize::{coerce_number, strip_tie_marker};

/// Previously known rows keyed by handle, used as a read-only merge source.
pub type Statistics = HashMap<String, ParticipantRow>;

/// Rank of a row: numeric, or a judge-native label for ties and markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Place {
    /// Numeric rank.
    Rank(u32),
    /// Judge-native label.
    Label(String),
}

impl Place {
    /// Interprets a JSON value as a place.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(Self::Rank)
                .or_else(|| n.as_f64().map(|f| Self::Label(f.to_string()))),
            Value::String(s) => Some(Self::parse(s)),
            _ => None,
        }
    }

    /// Parses a textual place, stripping tie markers when numeric.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        strip_tie_marker(text).map_or_else(|| Self::Label(text.trim().to_string()), Self::Rank)
    }

    /// Numeric rank, if any.
    #[must_use]
    pub fn rank(&self) -> Option<u32> {
        match self {
            Self::Rank(r) => Some(*r),
            Self::Label(_) => None,
        }
    }
}

impl From<u32> for Place {
    fn from(rank: u32) -> Self {
        Self::Rank(rank)
    }
}

/// Problem outcome: a score, or a judge-native marker such as `+2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreValue {
    /// Numeric score; negative encodes a penalized or failed outcome.
    Number(f64),
    /// Textual marker; a leading `+` means accepted.
    Text(String),
}

impl ScoreValue {
    /// Whether the outcome counts as solved.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        match self {
            Self::Number(n) => *n > 1e-9,
            Self::Text(t) => {
                t.starts_with('+') || coerce_number(t).and_then(|v| v.as_f64()).is_some_and(|n| n > 1e-9)
            }
        }
    }

    /// Numeric value, if any.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(t) => t.parse().ok(),
        }
    }
}

impl From<f64> for ScoreValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Outcome of one subtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscore {
    /// Points the subtest is worth.
    pub status: f64,
    /// Whether the subtest passed, when judged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<bool>,
    /// Verdict text.
    pub verdict: String,
}

/// Per-row result of one problem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemResult {
    /// Score or marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ScoreValue>,
    /// Formatted elapsed time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Positive but below the full score.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
    /// Penalty attempts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub penalty: Option<u32>,
    /// Submission language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Raw source text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    /// Judge status text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Link to the submission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Per-subtest outcomes in test order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subscores: Vec<Subscore>,
    /// Bonus accumulated from challenge events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_score: Option<f64>,
    /// Descriptions of the challenge events.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_info: Vec<String>,
}

impl ProblemResult {
    /// Whether the problem counts as solved.
    #[must_use]
    pub fn is_solved(&self) -> bool {
        self.result.as_ref().is_some_and(ScoreValue::is_positive)
    }

    /// Fills detail fields this result lacks from `cached`.
    pub fn fill_missing_from(&mut self, cached: &Self) {
        if self.result.is_none() {
            self.result.clone_from(&cached.result);
        }
        if self.time.is_none() {
            self.time.clone_from(&cached.time);
        }
        if self.language.is_none() {
            self.language.clone_from(&cached.language);
        }
        if self.solution.is_none() {
            self.solution.clone_from(&cached.solution);
        }
        if self.status.is_none() {
            self.status.clone_from(&cached.status);
        }
        if self.url.is_none() {
            self.url.clone_from(&cached.url);
        }
        if self.subscores.is_empty() {
            self.subscores.clone_from(&cached.subscores);
        }
        if self.extra_score.is_none() {
            self.extra_score = cached.extra_score;
        }
        if self.extra_info.is_empty() {
            self.extra_info.clone_from(&cached.extra_info);
        }
    }
}

/// Solved counters of a row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solved {
    /// Problems with a positive result.
    pub solving: u32,
}

/// One participant's row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantRow {
    /// Handle.
    pub member: String,
    /// Rank.
    pub place: Place,
    /// Total score.
    pub solving: f64,
    /// Solved counters.
    pub solved: Solved,
    /// Formatted penalty time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub penalty: Option<String>,
    /// Results by problem short code.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub problems: BTreeMap<String, ProblemResult>,
    /// Country code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Detail enrichment completed for this row.
    #[serde(default, rename = "_enriched", skip_serializing_if = "std::ops::Not::not")]
    pub enriched: bool,
    /// Judge-specific fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ParticipantRow {
    /// Creates a row with zero score.
    #[must_use]
    pub fn new(member: impl Into<String>, place: impl Into<Place>) -> Self {
        Self {
            member: member.into(),
            place: place.into(),
            solving: 0.0,
            solved: Solved::default(),
            penalty: None,
            problems: BTreeMap::new(),
            country: None,
            enriched: false,
            extra: BTreeMap::new(),
        }
    }

    /// Sets a judge-specific field.
    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extra.insert(key.into(), value.into());
    }

    /// Returns a judge-specific field.
    #[must_use]
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Recomputes `solved.solving` from the problem results.
    pub fn recount_solved(&mut self) {
        let solved = self.problems.values().filter(|p| p.is_solved()).count();
        self.solved.solving = u32::try_from(solved).unwrap_or(u32::MAX);
    }

    /// Whether `solved.solving` matches the positive problem results.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let solved = self.problems.values().filter(|p| p.is_solved()).count();
        solved == self.solved.solving as usize
    }

    /// Merges listing fields into `extra`; incoming values overwrite.
    pub fn merge_fields(&mut self, fields: BTreeMap<String, Value>) {
        for (key, value) in fields {
            if let Some(previous) = self.extra.get(&key) {
                if previous != &value {
                    tracing::debug!(member = %self.member, field = %key, "Overwriting field");
                }
            }
            self.extra.insert(key, value);
        }
    }

    /// Merges a cached, previously enriched row into this fresh one.
    ///
    /// Fresh scores are kept; detail fields missing from the fresh row are
    /// taken from the cache.
    pub fn merge_cached(&mut self, cached: &Self) {
        for (short, cached_problem) in &cached.problems {
            self.problems
                .entry(short.clone())
                .and_modify(|p| p.fill_missing_from(cached_problem))
                .or_insert_with(|| cached_problem.clone());
        }
        for (key, value) in &cached.extra {
            self.extra.entry(key.clone()).or_insert_with(|| value.clone());
        }
        if self.country.is_none() {
            self.country.clone_from(&cached.country);
        }
        self.enriched = cached.enriched;
        self.recount_solved();
    }
}

/// Static description of one problem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemDescriptor {
    /// Short code, unique within its set.
    pub short: String,
    /// Judge id, when it differs from `short`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Statement URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Maximum score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_score: Option<f64>,
    /// Category tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Authors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub writers: Vec<String>,
    /// Testers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub testers: Vec<String>,
}

impl ProblemDescriptor {
    /// Creates a descriptor with a short code.
    #[must_use]
    pub fn new(short: impl Into<String>) -> Self {
        Self {
            short: short.into(),
            ..Default::default()
        }
    }

    /// Sorts by ascending full score, then name.
    pub fn sort_by_score_then_name(problems: &mut [Self]) {
        problems.sort_by(|a, b| {
            let sa = a.full_score.unwrap_or(0.0);
            let sb = b.full_score.unwrap_or(0.0);
            sa.total_cmp(&sb).then_with(|| a.name.cmp(&b.name))
        });
    }
}

/// Problems of a contest, optionally split by division.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProblemSet {
    /// One ordered sequence.
    List(Vec<ProblemDescriptor>),
    /// Sequences keyed by division label.
    Divisions {
        /// Division label to problems.
        division: BTreeMap<String, Vec<ProblemDescriptor>>,
    },
}

impl Default for ProblemSet {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl ProblemSet {
    /// Problems of a division, or the whole list for undivided contests.
    #[must_use]
    pub fn for_division(&self, label: &str) -> Option<&[ProblemDescriptor]> {
        match self {
            Self::List(list) => Some(list),
            Self::Divisions { division } => division.get(label).map(Vec::as_slice),
        }
    }

    /// Total number of problems.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::List(list) => list.len(),
            Self::Divisions { division } => division.values().map(Vec::len).sum(),
        }
    }

    /// Whether there are no problems.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A medal tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medal {
    /// Tier name.
    pub name: String,
    /// Number of places awarded.
    pub count: u32,
}

/// Free-form rendering options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandingsOptions {
    /// Medal tiers in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medals: Option<Vec<Medal>>,
    /// Columns always shown, as (field, title).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixed_fields: Vec<(String, String)>,
}

/// Threshold filter for advancement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvanceFilter {
    /// Row field compared.
    pub field: String,
    /// Comparison operator, e.g. `le`.
    pub operator: String,
    /// Threshold value.
    pub threshold: u32,
}

/// Advancement metadata for multi-round contests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advancement {
    /// Human-readable rule.
    pub title: String,
    /// Filters a row must pass.
    pub filter: Vec<AdvanceFilter>,
}

/// Normalized standings of one contest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandingsDocument {
    /// Rows keyed by handle.
    pub result: BTreeMap<String, ParticipantRow>,
    /// Problems in display order.
    pub problems: ProblemSet,
    /// Row fields not rendered as ranking columns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hidden_fields: Vec<String>,
    /// Semantic tags per field.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields_types: BTreeMap<String, Vec<String>>,
    /// Rendering options.
    #[serde(default)]
    pub options: StandingsOptions,
    /// Standings URL actually used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Problem writers, most prolific first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub writers: Vec<String>,
    /// Advancement metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advance: Option<Advancement>,
    /// Document-level fields shown as info.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub info_fields: Vec<String>,
    /// Enrichment did not complete for every row.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
    /// Non-fatal problems met while building the document.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl StandingsDocument {
    /// Creates an empty document.
    #[must_use]
    pub fn new(url: Option<String>) -> Self {
        Self {
            url,
            ..Default::default()
        }
    }

    /// Hides a field, keeping insertion order and uniqueness.
    pub fn hide_field(&mut self, field: impl Into<String>) {
        let field = field.into();
        if !self.hidden_fields.contains(&field) {
            self.hidden_fields.push(field);
        }
    }

    /// Tags a field with a semantic type.
    pub fn set_field_type(&mut self, field: impl Into<String>, kind: impl Into<String>) {
        let kinds = self.fields_types.entry(field.into()).or_default();
        let kind = kind.into();
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }

    /// Marks the document partial and records why.
    pub fn mark_partial(&mut self, warning: impl Into<String>) {
        self.partial = true;
        self.warnings.push(warning.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn problem(result: f64) -> ProblemResult {
        ProblemResult {
            result: Some(ScoreValue::Number(result)),
            ..Default::default()
        }
    }

    #[test]
    fn test_place_parsing() {
        assert_eq!(Place::parse("12"), Place::Rank(12));
        assert_eq!(Place::parse("=3"), Place::Rank(3));
        assert_eq!(Place::parse("DNF"), Place::Label("DNF".to_string()));
        assert_eq!(Place::from_value(&json!(4)), Some(Place::Rank(4)));
        assert_eq!(Place::from_value(&json!("7T")), Some(Place::Rank(7)));
        assert_eq!(Place::from_value(&json!(null)), None);
    }

    #[test]
    fn test_score_value_positivity() {
        assert!(ScoreValue::Number(250.5).is_positive());
        assert!(!ScoreValue::Number(-75.0).is_positive());
        assert!(!ScoreValue::Number(0.0).is_positive());
        assert!(ScoreValue::Text("+2".into()).is_positive());
        assert!(ScoreValue::Text("5".into()).is_positive());
        assert!(ScoreValue::Text("12,5".into()).is_positive());
        assert!(!ScoreValue::Text("-3".into()).is_positive());
        assert!(!ScoreValue::Text("0".into()).is_positive());
        assert!(!ScoreValue::Text("-1".into()).is_positive());
    }

    #[test]
    fn test_recount_solved_matches_positive_results() {
        let mut row = ParticipantRow::new("tourist", 1);
        row.problems.insert("A".into(), problem(250.0));
        row.problems.insert("B".into(), problem(-500.0));
        row.problems.insert("C".into(), ProblemResult::default());
        row.problems.insert("D".into(), problem(1000.0));
        assert!(!row.is_consistent());
        row.recount_solved();
        assert_eq!(row.solved.solving, 2);
        assert!(row.is_consistent());
    }

    #[test]
    fn test_merge_cached_keeps_fresh_scores() {
        let mut fresh = ParticipantRow::new("petr", 2);
        fresh.problems.insert("A".into(), problem(300.0));

        let mut cached = ParticipantRow::new("petr", 3);
        let mut cached_a = problem(100.0);
        cached_a.solution = Some("int main() {}".into());
        cached.problems.insert("A".into(), cached_a);
        cached.problems.insert("B".into(), problem(50.0));
        cached.set_extra("room", "12");
        cached.enriched = true;

        fresh.merge_cached(&cached);
        assert_eq!(fresh.place, Place::Rank(2));
        assert_eq!(fresh.problems["A"].result, Some(ScoreValue::Number(300.0)));
        assert_eq!(fresh.problems["A"].solution.as_deref(), Some("int main() {}"));
        assert!(fresh.problems.contains_key("B"));
        assert_eq!(fresh.solved.solving, 2);
        assert_eq!(fresh.extra("room"), Some(&json!("12")));
        assert!(fresh.enriched);
    }

    #[test]
    fn test_row_serialization_flattens_extra() {
        let mut row = ParticipantRow::new("a", 1);
        row.solving = 10.0;
        row.set_extra("delta_rank", 3);
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["delta_rank"], json!(3));
        assert_eq!(value["solved"], json!({"solving": 0}));
        assert!(value.get("_enriched").is_none());

        let back: ParticipantRow = serde_json::from_value(value).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn test_problem_set_serialization() {
        let list = ProblemSet::List(vec![ProblemDescriptor::new("A")]);
        assert_eq!(serde_json::to_value(&list).unwrap(), json!([{"short": "A"}]));

        let mut division = BTreeMap::new();
        division.insert("I".to_string(), vec![ProblemDescriptor::new("Easy")]);
        let divided = ProblemSet::Divisions { division };
        assert_eq!(
            serde_json::to_value(&divided).unwrap(),
            json!({"division": {"I": [{"short": "Easy"}]}})
        );
        assert_eq!(divided.len(), 1);
        assert!(divided.for_division("II").is_none());
    }

    #[test]
    fn test_sort_by_score_then_name() {
        let mut problems = vec![
            ProblemDescriptor { short: "x".into(), name: Some("B".into()), full_score: Some(10.0), ..Default::default() },
            ProblemDescriptor { short: "y".into(), name: Some("A".into()), full_score: Some(10.0), ..Default::default() },
            ProblemDescriptor { short: "z".into(), name: Some("C".into()), full_score: Some(5.0), ..Default::default() },
        ];
        ProblemDescriptor::sort_by_score_then_name(&mut problems);
        let order: Vec<_> = problems.iter().map(|p| p.short.as_str()).collect();
        assert_eq!(order, vec!["z", "y", "x"]);
    }

    #[test]
    fn test_document_field_helpers() {
        let mut doc = StandingsDocument::new(None);
        doc.hide_field("room");
        doc.hide_field("room");
        doc.set_field_type("delta_rank", "delta");
        doc.set_field_type("delta_rank", "delta");
        assert_eq!(doc.hidden_fields, vec!["room"]);
        assert_eq!(doc.fields_types["delta_rank"], vec!["delta"]);
        doc.mark_partial("2 failed");
        assert!(doc.partial);
    }
}
