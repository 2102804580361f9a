//! Google coding competitions adapter: Code Jam, Kick Start and Hash Code.

pub mod api;
pub mod codec;
pub mod hashcode;
pub mod legacy;

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use tracing::Instrument;

use super::{apply_finals_medals, ensure_rows, recount_all, Adapter, FetchPhase, PhaseTracker, Session};
use crate::config::StandingsConfig;
use crate::errors::{Result, StandingsError};
use crate::models::{ContestDescriptor, ProfileInfo, StandingsDocument, Statistics};
use crate::observability::fetch_span;
use crate::requester::Requester;

const NAME: &str = "google";

static HASHCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bhash.*code\b.*(round|final)$").expect("valid regex"));

static FINALS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfinal\S*(?:\s+round)?$").expect("valid regex"));

/// Data source of a Google contest, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoogleVariant {
    /// Hash Code archive or judge scoreboard.
    HashCode,
    /// Scoreboard poll API.
    PollApi,
    /// Legacy Code Jam scoreboard pages.
    Legacy,
}

/// Chooses the data source; unknown URLs are a configuration error.
pub fn select_variant(descriptor: &ContestDescriptor) -> Result<GoogleVariant> {
    if descriptor.info.contains_key("hashcode_scoreboard") || HASHCODE_RE.is_match(&descriptor.name) {
        Ok(GoogleVariant::HashCode)
    } else if descriptor.url.contains("/codingcompetitions.withgoogle.com/") {
        Ok(GoogleVariant::PollApi)
    } else if descriptor.url.contains("/code.google.com/") || descriptor.url.contains("/codejam.withgoogle.com/") {
        Ok(GoogleVariant::Legacy)
    } else {
        Err(StandingsError::Configuration(format!("unsupported url {}", descriptor.url)))
    }
}

/// Google adapter.
#[derive(Debug)]
pub struct GoogleAdapter {
    session: Session,
    config: StandingsConfig,
}

impl GoogleAdapter {
    /// Creates the adapter over a shared requester.
    #[must_use]
    pub fn new(requester: Arc<dyn Requester>, config: StandingsConfig) -> Self {
        Self {
            session: Session::new(requester, &config),
            config,
        }
    }

    async fn fetch(
        &self,
        descriptor: &ContestDescriptor,
        users: Option<&HashSet<String>>,
        statistics: Option<&Statistics>,
        tracker: &mut PhaseTracker,
    ) -> Result<StandingsDocument> {
        tracker.advance(FetchPhase::Resolving);
        let variant = select_variant(descriptor)?;
        tracing::debug!(?variant, "Selected data source");

        let mut document = StandingsDocument::new(None);
        match variant {
            GoogleVariant::HashCode => {
                hashcode::fetch(&self.session, &self.config, descriptor, users, &mut document, tracker).await?;
            }
            GoogleVariant::PollApi => {
                api::fetch(&self.session, &self.config, descriptor, users, statistics, &mut document, tracker).await?;
            }
            GoogleVariant::Legacy => {
                let standings_url = descriptor
                    .standings_url
                    .clone()
                    .unwrap_or_else(|| legacy::scoreboard_url(&descriptor.url));
                legacy::fetch(&self.session, &self.config, &standings_url, users, &mut document, tracker).await?;
            }
        }

        tracker.advance(FetchPhase::PostProcessing);
        apply_finals_medals(&mut document, &descriptor.name, &FINALS_RE);
        recount_all(&mut document);
        ensure_rows(&document, users)?;
        Ok(document)
    }
}

#[async_trait]
impl Adapter for GoogleAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supports(&self, descriptor: &ContestDescriptor) -> bool {
        descriptor.resource.contains("withgoogle")
            || descriptor.resource.contains("google.com")
            || select_variant(descriptor).is_ok()
    }

    async fn discover_standings_url(&self, descriptor: &ContestDescriptor) -> Result<Option<String>> {
        Ok(match select_variant(descriptor)? {
            GoogleVariant::Legacy => Some(legacy::scoreboard_url(&descriptor.url)),
            GoogleVariant::PollApi => Some(descriptor.url.clone()),
            GoogleVariant::HashCode => None,
        })
    }

    async fn fetch_standings(
        &self,
        descriptor: &ContestDescriptor,
        users: Option<&HashSet<String>>,
        statistics: Option<&Statistics>,
    ) -> Result<StandingsDocument> {
        let span = fetch_span(NAME, &descriptor.key);
        async move {
            let mut tracker = PhaseTracker::new(NAME);
            let result = self.fetch(descriptor, users, statistics, &mut tracker).await;
            let document = tracker.track(result)?;
            tracker.advance(FetchPhase::Done);
            Ok(document)
        }
        .instrument(span)
        .await
    }

    /// The judge publishes no profile data; every handle yields an empty
    /// profile.
    async fn fetch_participant_profiles(&self, handles: &[String]) -> Result<Vec<ProfileInfo>> {
        Ok(handles.iter().map(ProfileInfo::new).collect())
    }
}
