//! Topcoder adapter: single round matches and marathon matches.

mod basic_data;
pub mod discovery;
pub mod marathon;
pub mod profiles;
pub mod srm;

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

const NAME: &str = "topcoder";

static CHALLENGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/challenges/(\d+)").expect("valid regex"));

static FINALS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfinals?(?:\s+rounds?)?$").expect("valid regex"));

/// Data source of a Topcoder contest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopcoderVariant {
    /// Marathon match served by the challenge statistics API.
    MarathonMatch {
        /// Challenge id.
        challenge_id: String,
    },
    /// Single round match scraped from the statistics pages.
    SingleRoundMatch,
}

/// Marathon when `url` or `standings_url` names a challenge, SRM otherwise.
#[must_use]
pub fn select_variant(descriptor: &ContestDescriptor) -> TopcoderVariant {
    std::iter::once(descriptor.url.as_str())
        .chain(descriptor.standings_url.as_deref())
        .find_map(|url| CHALLENGE_RE.captures(url).and_then(|c| c.get(1)))
        .map_or(TopcoderVariant::SingleRoundMatch, |id| TopcoderVariant::MarathonMatch {
            challenge_id: id.as_str().to_string(),
        })
}

/// Topcoder adapter.
#[derive(Debug)]
pub struct TopcoderAdapter {
    session: Session,
    config: StandingsConfig,
}

impl TopcoderAdapter {
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
        let mut document = match select_variant(descriptor) {
            TopcoderVariant::MarathonMatch { challenge_id } => {
                let url = self.config.topcoder.marathon_api_url.replace("{id}", &challenge_id);
                tracker.advance(FetchPhase::Listing);
                let payload = self.session.get(&url).await?;
                let mut document = marathon::parse_statistics(&payload, &challenge_id, &descriptor.name, users)?;
                document.url = Some(descriptor.standings_url.clone().unwrap_or_else(|| descriptor.url.clone()));
                document
            }
            TopcoderVariant::SingleRoundMatch => {
                let standings_url = match &descriptor.standings_url {
                    Some(url) => url.clone(),
                    None => self.discover_standings_url(descriptor).await?.ok_or_else(|| {
                        StandingsError::Configuration(format!("no standings url for {}", descriptor.name))
                    })?,
                };
                tracker.advance(FetchPhase::Listing);
                let mut document = StandingsDocument::new(Some(standings_url.clone()));
                srm::fetch(
                    &self.session,
                    &self.config,
                    &standings_url,
                    users,
                    statistics,
                    &mut document,
                    tracker,
                )
                .await?;
                document
            }
        };

        tracker.advance(FetchPhase::PostProcessing);
        apply_finals_medals(&mut document, &descriptor.name, &FINALS_RE);
        recount_all(&mut document);
        ensure_rows(&document, users)?;
        Ok(document)
    }
}

#[async_trait]
impl Adapter for TopcoderAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supports(&self, descriptor: &ContestDescriptor) -> bool {
        descriptor.resource.contains("topcoder") || descriptor.url.contains("topcoder.com")
    }

    async fn discover_standings_url(&self, descriptor: &ContestDescriptor) -> Result<Option<String>> {
        if matches!(select_variant(descriptor), TopcoderVariant::MarathonMatch { .. }) {
            return Ok(None);
        }
        discovery::discover(&self.session, &self.config.topcoder, &descriptor.name, descriptor.start_time).await
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

    async fn fetch_participant_profiles(&self, handles: &[String]) -> Result<Vec<ProfileInfo>> {
        Ok(profiles::fetch_profiles(&self.session, &self.config, handles).await)
    }
}
