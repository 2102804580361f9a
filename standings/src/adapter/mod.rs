//! Judge adapters.
//!
//! An [`Adapter`] turns a [`ContestDescriptor`] into a [`StandingsDocument`].
//! Each judge picks its data source through an explicit predicate chain,
//! fetches listing pages, optionally enriches rows through a
//! [`FetchEngine`](crate::engine::FetchEngine) and finishes with the shared
//! post-processing helpers defined here.

pub mod google;
mod phase;
mod registry;
mod session;
pub mod topcoder;


use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;

use crate::engine::FetchProgress;
use crate::errors::{Result, StandingsError};
use crate::models::{ContestDescriptor, Medal, ProfileInfo, StandingsDocument, Statistics};

pub use phase::{FetchPhase, PhaseTracker};
pub use registry::AdapterRegistry;
pub use session::Session;

/// Standings-fetch contract implemented once per judge.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Short adapter name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this adapter handles the descriptor.
    fn supports(&self, descriptor: &ContestDescriptor) -> bool;

    /// Searches the judge's listings for the standings URL of a contest
    /// that was given without one.
    async fn discover_standings_url(&self, descriptor: &ContestDescriptor) -> Result<Option<String>>;

    /// Fetches and normalizes the standings of one contest.
    ///
    /// `users` restricts rows and detail fetches to a subset of handles; an
    /// empty set fetches problem metadata only. Rows of `statistics` marked
    /// enriched are merged instead of fetched again.
    async fn fetch_standings(
        &self,
        descriptor: &ContestDescriptor,
        users: Option<&HashSet<String>>,
        statistics: Option<&Statistics>,
    ) -> Result<StandingsDocument>;

    /// Looks up public profiles. A handle whose lookup fails yields a stale
    /// placeholder instead of failing the batch.
    async fn fetch_participant_profiles(&self, handles: &[String]) -> Result<Vec<ProfileInfo>>;
}

/// Resolves `href` against `base`, keeping `href` when either is malformed.
#[must_use]
pub fn join_url(base: &str, href: &str) -> String {
    reqwest::Url::parse(base)
        .and_then(|b| b.join(href))
        .map_or_else(|_| href.to_string(), |u| u.to_string())
}

/// Whether `handle` passes the optional users filter.
#[must_use]
pub fn is_requested(users: Option<&HashSet<String>>, handle: &str) -> bool {
    users.map_or(true, |u| u.contains(handle))
}

/// Whether the cached row of `handle` was already enriched.
#[must_use]
pub fn is_cached_enriched(statistics: Option<&Statistics>, handle: &str) -> bool {
    statistics
        .and_then(|s| s.get(handle))
        .is_some_and(|row| row.enriched)
}

/// Awards one gold, silver and bronze medal when the contest name matches
/// `finals`. Scores play no part.
pub fn apply_finals_medals(document: &mut StandingsDocument, contest_name: &str, finals: &Regex) {
    if !finals.is_match(contest_name) {
        return;
    }
    document.options.medals = Some(
        ["gold", "silver", "bronze"]
            .into_iter()
            .map(|name| Medal {
                name: name.to_string(),
                count: 1,
            })
            .collect(),
    );
}

/// Records an incomplete enrichment phase on the document.
pub fn record_enrichment(document: &mut StandingsDocument, phase: &str, progress: FetchProgress) {
    if let Some(error) = progress.into_partial_error() {
        tracing::warn!(phase, error = %error, "Enrichment incomplete");
        document.mark_partial(format!("{phase}: {error}"));
    }
}

/// Fails with [`StandingsError::EmptyStandings`] when an unfiltered fetch
/// produced no rows.
pub fn ensure_rows(document: &StandingsDocument, users: Option<&HashSet<String>>) -> Result<()> {
    if document.result.is_empty() && users.is_none() {
        return Err(StandingsError::EmptyStandings {
            url: document.url.clone(),
        });
    }
    Ok(())
}

/// Recounts `solved` of every row so it matches the positive results.
pub fn recount_all(document: &mut StandingsDocument) {
    for row in document.result.values_mut() {
        row.recount_solved();
    }
}
