//! Phase state machine of one standings fetch.

use serde::Serialize;
use std::fmt;

use crate::errors::StandingsError;

/// Phase of a `fetch_standings` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchPhase {
    /// Nothing done yet.
    Unresolved,
    /// Choosing the data source and standings URL.
    Resolving,
    /// Fetching listing pages.
    Listing,
    /// Fetching per-row details.
    Enriching,
    /// Medals, advancement and field metadata.
    PostProcessing,
    /// Document produced.
    Done,
    /// Aborted with an error of the given kind.
    Failed(&'static str),
}

impl FetchPhase {
    fn order(self) -> u8 {
        match self {
            Self::Unresolved => 0,
            Self::Resolving => 1,
            Self::Listing => 2,
            Self::Enriching => 3,
            Self::PostProcessing => 4,
            Self::Done => 5,
            Self::Failed(_) => 6,
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

impl fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved => f.write_str("unresolved"),
            Self::Resolving => f.write_str("resolving"),
            Self::Listing => f.write_str("listing"),
            Self::Enriching => f.write_str("enriching"),
            Self::PostProcessing => f.write_str("post_processing"),
            Self::Done => f.write_str("done"),
            Self::Failed(kind) => write!(f, "failed({kind})"),
        }
    }
}

/// Tracks and logs phase transitions; phases only move forward.
#[derive(Debug)]
pub struct PhaseTracker {
    adapter: &'static str,
    phase: FetchPhase,
}

impl PhaseTracker {
    /// Starts in [`FetchPhase::Unresolved`].
    #[must_use]
    pub fn new(adapter: &'static str) -> Self {
        Self {
            adapter,
            phase: FetchPhase::Unresolved,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> FetchPhase {
        self.phase
    }

    /// Moves to `next` when it lies ahead of the current phase.
    pub fn advance(&mut self, next: FetchPhase) {
        if self.phase.is_terminal() || next.order() <= self.phase.order() {
            tracing::debug!(adapter = self.adapter, from = %self.phase, to = %next, "Ignoring phase transition");
            return;
        }
        tracing::info!(adapter = self.adapter, from = %self.phase, to = %next, "Phase transition");
        self.phase = next;
    }

    /// Records a fatal error.
    pub fn fail(&mut self, error: &StandingsError) {
        if self.phase.is_terminal() {
            return;
        }
        tracing::error!(adapter = self.adapter, phase = %self.phase, kind = error.kind(), error = %error, "Fetch failed");
        self.phase = FetchPhase::Failed(error.kind());
    }

    /// Passes `result` through, failing the tracker on error.
    pub fn track<T>(&mut self, result: Result<T, StandingsError>) -> Result<T, StandingsError> {
        if let Err(error) = &result {
            self.fail(error);
        }
        result
    }
}
