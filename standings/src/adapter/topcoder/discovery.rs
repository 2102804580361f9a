//! Standings URL discovery from Topcoder match lists.

use chrono::{DateTime, NaiveDate, Utc};
use regex::{Regex, RegexBuilder};
use scraper::{ElementRef, Html};

use crate::adapter::{join_url, Session};
use crate::config::TopcoderConfig;
use crate::errors::{Result, StandingsError};
use crate::normalize::similarity;
use crate::table::selector;

/// A round listed on a match-list page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchListEntry {
    /// Absolute round overview URL.
    pub url: String,
    /// Round title.
    pub title: String,
    /// Listed date.
    pub date: NaiveDate,
}

/// Parses match-list rows carrying a `/stat...rd=N` title link and an
/// `MM.DD.YYYY` date cell.
pub fn parse_match_list(html: &str, base_url: &str) -> Result<Vec<MatchListEntry>> {
    let document = Html::parse_document(html);
    let rows = selector("tr")?;
    let links = selector("a[href]")?;

    let mut entries = Vec::new();
    for row in document.select(&rows) {
        let cells: Vec<ElementRef<'_>> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().name() == "td")
            .collect();

        let link = cells.iter().flat_map(|c| c.select(&links)).find(|a| {
            a.value()
                .attr("href")
                .is_some_and(|h| h.contains("/stat") && h.contains("rd="))
        });
        let date = cells.iter().find_map(|c| {
            let text: String = c.text().collect();
            NaiveDate::parse_from_str(text.trim(), "%m.%d.%Y").ok()
        });

        if let (Some(link), Some(date)) = (link, date) {
            let href = link.value().attr("href").unwrap_or_default();
            entries.push(MatchListEntry {
                url: join_url(base_url, href),
                title: link.text().collect::<String>().trim().to_string(),
                date,
            });
        }
    }
    Ok(entries)
}

/// Picks the entry closest to `name` among those listed within
/// `window_days` of `start`.
///
/// A candidate must score strictly above the best so far, which starts at
/// `threshold`, so the first of equally similar titles wins.
#[must_use]
pub fn best_match<'a>(
    entries: &'a [MatchListEntry],
    name: &str,
    start: DateTime<Utc>,
    window_days: i64,
    threshold: f64,
) -> Option<(&'a MatchListEntry, f64)> {
    let start = start.naive_utc();
    let mut best: Option<(&MatchListEntry, f64)> = None;
    let mut opt = threshold;
    for entry in entries {
        let listed = entry.date.and_time(chrono::NaiveTime::MIN);
        if (listed - start).num_seconds().abs() >= window_days * 86_400 {
            continue;
        }
        let score = similarity(&entry.title, name);
        if score > opt {
            opt = score;
            best = Some((entry, score));
        }
    }
    best
}

fn srm_abbreviation() -> Result<Regex> {
    RegexBuilder::new(r"Single\s+Round\s+Match")
        .case_insensitive(true)
        .build()
        .map_err(|e| StandingsError::Configuration(e.to_string()))
}

/// Finds the round overview `<option>` whose label starts with `name`.
///
/// "Single Round Match" is read as "SRM" on both sides and any run of
/// whitespace in the name matches any whitespace in the label.
pub fn find_round_option(html: &str, base_url: &str, name: &str) -> Result<Option<String>> {
    let srm = srm_abbreviation()?;
    let name = srm.replace_all(name.trim(), "SRM");
    let pattern = name
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    let label_re = RegexBuilder::new(&format!(r"^\s*{pattern}"))
        .case_insensitive(true)
        .build()
        .map_err(|e| StandingsError::Configuration(e.to_string()))?;

    let document = Html::parse_document(html);
    let options = selector("option[value]")?;
    Ok(document.select(&options).find_map(|option| {
        let value = option.value().attr("value")?;
        if !(value.contains("/stat") && value.contains("round_overview")) {
            return None;
        }
        let label: String = option.text().collect();
        label_re
            .is_match(&srm.replace_all(&label, "SRM"))
            .then(|| join_url(base_url, value))
    }))
}

/// Searches the match lists, then the round overview selector.
pub async fn discover(
    session: &Session,
    config: &TopcoderConfig,
    name: &str,
    start: DateTime<Utc>,
) -> Result<Option<String>> {
    if Utc::now() - start >= chrono::Duration::days(config.discovery_max_age_days) {
        tracing::debug!(name, "Contest too old for discovery");
        return Ok(None);
    }

    let mut found: Option<(String, f64)> = None;
    for list_url in &config.match_list_urls {
        let page = match session.get(list_url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(url = %list_url, error = %e, "Match list unavailable");
                continue;
            }
        };
        let entries = parse_match_list(&page, list_url)?;
        let threshold = found.as_ref().map_or(config.similarity_threshold, |(_, s)| *s);
        if let Some((entry, score)) = best_match(&entries, name, start, config.discovery_window_days, threshold) {
            tracing::debug!(title = %entry.title, score, "Match list candidate");
            found = Some((entry.url.clone(), score));
        }
    }
    if let Some((url, _)) = found {
        return Ok(Some(url));
    }

    let page = session.get(&config.round_overview_url).await?;
    find_round_option(&page, &config.round_overview_url, name)
}
