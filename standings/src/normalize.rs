//! Pure normalization helpers shared by all adapters.
//!
//! Nothing here performs I/O.

use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

static INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+$").expect("valid regex"));

static TIE_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^0-9]*?([0-9]+)[^0-9]*$").expect("valid regex"));

/// Coerces a judge-formatted cell into a JSON value.
///
/// Empty and `N/A` cells yield `None`. A decimal comma is read as a decimal
/// point. Integers become integers, other numbers floats, anything else is
/// kept as a trimmed string.
#[must_use]
pub fn coerce_number(raw: &str) -> Option<Value> {
    let text = raw.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("n/a") {
        return None;
    }
    if text.contains(',') {
        let dotted = text.replace(',', ".");
        return Some(
            dotted
                .parse::<f64>()
                .ok()
                .and_then(|f| serde_json::Number::from_f64(f).map(Value::Number))
                .unwrap_or_else(|| Value::String(text.to_string())),
        );
    }
    if INTEGER_RE.is_match(text) {
        if let Ok(n) = text.parse::<i64>() {
            return Some(Value::from(n));
        }
    }
    if text.contains('.') {
        if let Some(n) = text.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            return Some(Value::Number(n));
        }
    }
    Some(Value::String(text.to_string()))
}

/// Parses a number written with thousands separators (`1,234 567`).
#[must_use]
pub fn parse_grouped_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// Extracts a rank from text with tie markers such as `=3` or `12T`.
#[must_use]
pub fn strip_tie_marker(raw: &str) -> Option<u32> {
    TIE_MARKER_RE
        .captures(raw.trim())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Normalizes a header key: trimmed, lowercase, spaces to underscores.
#[must_use]
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace(' ', "_")
}

/// Converts a header→cell mapping into normalized keys and coerced values.
///
/// Entries with empty keys or empty/`N/A` values are dropped.
pub fn dict_as_number<K, V, I>(pairs: I) -> BTreeMap<String, Value>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    pairs
        .into_iter()
        .filter_map(|(k, v)| {
            let key = normalize_key(k.as_ref());
            if key.is_empty() {
                return None;
            }
            coerce_number(v.as_ref()).map(|value| (key, value))
        })
        .collect()
}

/// Formats elapsed seconds as `H:MM:SS`, or `M:SS` when under an hour.
#[must_use]
pub fn format_time(seconds: i64) -> String {
    format_time_segments(seconds, 2)
}

/// Formats elapsed seconds with at least `segments` colon-separated parts.
#[must_use]
pub fn format_time_segments(seconds: i64, segments: usize) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let t = seconds.unsigned_abs();
    let hours = t / 3600;
    if hours > 0 || segments >= 3 {
        format!("{sign}{hours}:{:02}:{:02}", t / 60 % 60, t % 60)
    } else {
        format!("{sign}{}:{:02}", t / 60, t % 60)
    }
}

/// Formats fractional seconds, truncating toward zero.
#[must_use]
pub fn format_seconds(seconds: f64) -> String {
    format_time(seconds.trunc() as i64)
}

/// Formats a penalty given in microseconds.
#[must_use]
pub fn format_micros_penalty(micros: i64) -> String {
    format_time(micros / 1_000_000)
}

/// Rounds to two decimals, the precision used for score deltas.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Difference `current - previous` rounded to two decimals.
#[must_use]
pub fn delta(current: f64, previous: f64) -> f64 {
    round2(current - previous)
}

/// Token-set Jaccard similarity of two titles.
///
/// Symmetric and within `[0, 1]`; two empty titles score 0.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let left: HashSet<&str> = a.split_whitespace().collect();
    let right: HashSet<&str> = b.split_whitespace().collect();
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = left.intersection(&right).count();
    intersection as f64 / union as f64
}

fn regional_indicator(c: char) -> Option<char> {
    let code = c as u32;
    (0x1F1E6..=0x1F1FF)
        .contains(&code)
        .then(|| char::from_u32(u32::from(b'A') + code - 0x1F1E6))
        .flatten()
}

fn flag_code(token: &str) -> Option<String> {
    let mut chars = token.chars();
    let first = regional_indicator(chars.next()?)?;
    let second = regional_indicator(chars.next()?)?;
    chars.next().is_none().then(|| format!("{first}{second}"))
}

/// Splits leading flag emoji off a display name.
///
/// Returns the ISO 3166 alpha-2 codes of the flags and the remaining name.
#[must_use]
pub fn split_flag_prefix(name: &str) -> (Vec<String>, String) {
    let mut codes = Vec::new();
    let mut rest = name.trim_start();
    loop {
        let token_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        match flag_code(&rest[..token_end]) {
            Some(code) => {
                codes.push(code);
                rest = rest[token_end..].trim_start();
            }
            None => break,
        }
    }
    (codes, rest.trim().to_string())
}

/// Decodes HTML character references.
#[must_use]
pub fn unescape_html(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    scraper::Html::parse_fragment(text)
        .root_element()
        .text()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(" 42 "), Some(json!(42)));
        assert_eq!(coerce_number("-7"), Some(json!(-7)));
        assert_eq!(coerce_number("123,45"), Some(json!(123.45)));
        assert_eq!(coerce_number("0.5"), Some(json!(0.5)));
        assert_eq!(coerce_number("N/A"), None);
        assert_eq!(coerce_number("   "), None);
        assert_eq!(coerce_number("Passed System Test"), Some(json!("Passed System Test")));
        assert_eq!(coerce_number("10:05"), Some(json!("10:05")));
    }

    #[test]
    fn test_parse_grouped_number() {
        assert_eq!(parse_grouped_number("1,234,567"), Some(1_234_567.0));
        assert_eq!(parse_grouped_number("7 654 321"), Some(7_654_321.0));
        assert_eq!(parse_grouped_number(""), None);
        assert_eq!(parse_grouped_number("abc"), None);
    }

    #[test]
    fn test_strip_tie_marker() {
        assert_eq!(strip_tie_marker("12"), Some(12));
        assert_eq!(strip_tie_marker("=3"), Some(3));
        assert_eq!(strip_tie_marker("7T"), Some(7));
        assert_eq!(strip_tie_marker("DNF"), None);
        assert_eq!(strip_tie_marker("1-2"), None);
    }

    #[test]
    fn test_dict_as_number() {
        let fields = dict_as_number(vec![
            ("Division Placed", "3"),
            ("Point Total", "1234,56"),
            ("Old Rating", ""),
            ("Adv.", "Yes"),
            ("", "x"),
        ]);
        assert_eq!(fields.get("division_placed"), Some(&json!(3)));
        assert_eq!(fields.get("point_total"), Some(&json!(1234.56)));
        assert_eq!(fields.get("adv."), Some(&json!("Yes")));
        assert!(!fields.contains_key("old_rating"));
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(65), "1:05");
        assert_eq!(format_time(3661), "1:01:01");
        assert_eq!(format_time(0), "0:00");
        assert_eq!(format_time(-65), "-1:05");
        assert_eq!(format_time_segments(65, 3), "0:01:05");
        assert_eq!(format_seconds(125.9), "2:05");
        assert_eq!(format_micros_penalty(3_723_500_000), "1:02:03");
    }

    #[test]
    fn test_similarity_properties() {
        let a = "SRM 752";
        let b = "SRM 752 Finals";
        let c = "Marathon Match";
        assert!(similarity(a, b) > similarity(a, c));
        assert_eq!(similarity(a, b), similarity(b, a));
        assert_eq!(similarity(a, a), 1.0);
        assert_eq!(similarity("", ""), 0.0);
        for (x, y) in [(a, b), (a, c), (b, c), ("", a)] {
            let s = similarity(x, y);
            assert!((0.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn test_split_flag_prefix() {
        let (codes, name) = split_flag_prefix("🇵🇱 🇩🇪 Team Rocket");
        assert_eq!(codes, vec!["PL", "DE"]);
        assert_eq!(name, "Team Rocket");

        let (codes, name) = split_flag_prefix("No Flags Here");
        assert!(codes.is_empty());
        assert_eq!(name, "No Flags Here");
    }

    #[test]
    fn test_unescape_html() {
        assert_eq!(unescape_html("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(unescape_html("plain"), "plain");
    }

    #[test]
    fn test_delta() {
        assert_eq!(delta(95.555, 90.0), 5.56);
        assert_eq!(round2(1.0 / 3.0), 0.33);
    }
}
